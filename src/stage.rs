use crate::config::{Config, FailurePolicy};
use crate::errors::{RestoreError, Result};
use crate::layout::FolderLayout;
use crate::progress_tracker::ProgressTracker;

/// Everything a stage needs, borrowed from the orchestrator.
pub struct StageContext<'a, C, F> {
    pub layout: &'a FolderLayout,
    pub client: &'a C,
    pub fetcher: &'a F,
    pub config: &'a Config,
}

/// Per-file counts for one stage. `processed` equals the final progress position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageReport {
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// What happened to one file that did not error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Outcome {
    Written,
    DownloadFailed(u16),
    Skipped,
}

/// Applies `policy` to a per-file error: abort hands it back, continue reports it.
pub(crate) fn handle_failure(
    policy: FailurePolicy,
    tracker: &ProgressTracker,
    report: &mut StageReport,
    error: RestoreError,
    message: String,
) -> Result<()> {
    match policy {
        FailurePolicy::Abort => {
            tracker.abandon();
            Err(error)
        }
        FailurePolicy::Continue => {
            tracing::debug!(error = ?error, "continuing past failed file");
            report.failed += 1;
            tracker.println(format!("✗ {}: {}", message, error));
            Ok(())
        }
    }
}
