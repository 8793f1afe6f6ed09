use std::io::{self, Write};

use indicatif::{ProgressBar, ProgressStyle};
use parking_lot::Mutex;

const TEMPLATE: &str =
    "{msg} {spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})";

/// Per-stage file counter plus the operator's message stream.
///
/// Messages always go to stdout, like the rest of the stage output. The bar
/// draws on stderr and is cleared while a message is written.
pub(crate) struct ProgressTracker {
    progress_bar: ProgressBar,
    out: Mutex<Box<dyn Write + Send>>,
}

impl ProgressTracker {
    pub(crate) fn new(total: usize, label: &'static str, visible: bool) -> Self {
        Self::with_output(total, label, visible, Box::new(io::stdout()))
    }

    fn with_output(
        total: usize,
        label: &'static str,
        visible: bool,
        out: Box<dyn Write + Send>,
    ) -> Self {
        let progress_bar = if visible {
            ProgressBar::new(total as u64)
        } else {
            ProgressBar::hidden()
        };
        progress_bar.set_length(total as u64);
        progress_bar.set_style(
            ProgressStyle::with_template(TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        progress_bar.set_message(label);

        Self {
            progress_bar,
            out: Mutex::new(out),
        }
    }

    pub(crate) fn println(&self, message: impl AsRef<str>) {
        self.progress_bar.suspend(|| {
            let mut out = self.out.lock();
            if let Err(e) = writeln!(out, "{}", message.as_ref()).and_then(|()| out.flush()) {
                tracing::debug!(error = %e, "failed to write progress message");
            }
        });
    }

    pub(crate) fn advance(&self) {
        self.progress_bar.inc(1);
    }

    pub(crate) fn position(&self) -> u64 {
        self.progress_bar.position()
    }

    pub(crate) fn finish(&self) {
        self.progress_bar.finish();
    }

    /// Leaves the bar where it stopped, for a stage that is aborting.
    pub(crate) fn abandon(&self) {
        self.progress_bar.abandon();
    }
}
