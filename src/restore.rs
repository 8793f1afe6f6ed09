use std::fs;
use std::path::Path;

use crate::errors::{RestoreError, Result};
use crate::files::{collect_images, mirrored_output_path};
use crate::progress_tracker::ProgressTracker;
use crate::stage::{handle_failure, Outcome, StageContext, StageReport};
use crate::traits::{ImageFetcher, InferenceClient};

pub const RESTORE_INPUT_KEY: &str = "img";
pub const RESTORED_PREFIX: &str = "restored_";

/// Restores every image anywhere under `photos`, mirroring its subdirectory
/// under `gfpgan` as `restored_<name>`.
///
/// The tree is scanned when the stage starts, so colorized copies written by
/// the previous stage are included.
pub fn restore_photos<C, F>(ctx: &StageContext<'_, C, F>) -> Result<StageReport>
where
    C: InferenceClient,
    F: ImageFetcher,
{
    let photos = ctx.layout.photos();
    let images = collect_images(&photos);

    println!("\nFound {} images to restore", images.len());
    tracing::info!(count = images.len(), "starting restoration");

    let tracker = ProgressTracker::new(images.len(), "Restoring photos", !ctx.config.no_progress);
    let mut report = StageReport::default();

    for input in &images {
        let relative = input
            .strip_prefix(&photos)
            .unwrap_or(input)
            .display()
            .to_string();
        tracker.println(format!("Restoring {}...", relative));

        match restore_one(ctx, &photos, input) {
            Ok(Outcome::Written) => {
                report.succeeded += 1;
                tracker.println(format!("✓ Successfully restored {}", relative));
            }
            Ok(Outcome::DownloadFailed(status)) => {
                report.failed += 1;
                tracker.println(format!(
                    "✗ Failed to download restored image for {} (HTTP {})",
                    relative, status
                ));
            }
            Ok(Outcome::Skipped) => {
                report.skipped += 1;
                tracker.println(format!("Skipping {}, already restored", relative));
            }
            Err(e) => handle_failure(
                ctx.config.restore_policy,
                &tracker,
                &mut report,
                e,
                format!("Failed to restore {}", relative),
            )?,
        }

        tracker.advance();
    }

    tracker.finish();
    report.processed = tracker.position() as usize;
    Ok(report)
}

fn restore_one<C, F>(ctx: &StageContext<'_, C, F>, photos: &Path, input: &Path) -> Result<Outcome>
where
    C: InferenceClient,
    F: ImageFetcher,
{
    let output = mirrored_output_path(input, photos, &ctx.layout.restored(), RESTORED_PREFIX)?;

    if ctx.config.skip_existing && output.exists() {
        return Ok(Outcome::Skipped);
    }

    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| RestoreError::fs(parent, "create output directory", e))?;
    }

    let url = ctx
        .client
        .run(&ctx.config.restore_model, RESTORE_INPUT_KEY, input)?;
    let fetched = ctx.fetcher.fetch(&url)?;
    if !fetched.is_ok() {
        tracing::debug!(url = %url, status = fetched.status, "restored download failed");
        return Ok(Outcome::DownloadFailed(fetched.status));
    }

    fs::write(&output, &fetched.bytes)
        .map_err(|e| RestoreError::fs(&output, "write restored image", e))?;

    Ok(Outcome::Written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, FailurePolicy};
    use crate::layout::FolderLayout;
    use crate::mocks::{MockFetcher, MockInferenceClient};
    use tempfile::TempDir;

    fn setup() -> Result<(TempDir, FolderLayout, Config)> {
        let temp_dir = TempDir::new()?;
        let layout = FolderLayout::new(temp_dir.path());
        layout.ensure()?;
        let mut config = Config::with_base_dir(temp_dir.path());
        config.no_progress = true;
        Ok((temp_dir, layout, config))
    }

    #[test]
    fn test_output_mirrors_subdirectories() -> Result<()> {
        let (_temp_dir, layout, config) = setup()?;
        fs::create_dir_all(layout.photos().join("family/1950s"))?;
        fs::write(layout.photos().join("family/1950s/wedding.JPG"), b"w")?;
        fs::write(layout.photos().join("top.png"), b"t")?;
        fs::write(layout.bn().join("a.jpg"), b"a")?;

        let client = MockInferenceClient::new();
        let fetcher = MockFetcher::new();
        let ctx = StageContext {
            layout: &layout,
            client: &client,
            fetcher: &fetcher,
            config: &config,
        };

        let report = restore_photos(&ctx)?;
        assert_eq!(report.succeeded, 3);

        let restored = layout.restored();
        assert!(restored.join("family/1950s/restored_wedding.JPG").is_file());
        assert!(restored.join("restored_top.png").is_file());
        assert!(restored.join("bn/restored_a.jpg").is_file());

        for call in client.calls() {
            assert_eq!(call.input_key, RESTORE_INPUT_KEY);
            assert_eq!(call.model.name, "gfpgan");
        }
        Ok(())
    }

    #[test]
    fn test_errors_are_reported_and_skipped_by_default() -> Result<()> {
        let (_temp_dir, layout, config) = setup()?;
        fs::write(layout.photos().join("a.jpg"), b"a")?;
        fs::write(layout.photos().join("b.jpg"), b"b")?;
        fs::write(layout.photos().join("c.jpg"), b"c")?;

        let client = MockInferenceClient::new().fail_on("a.jpg");
        let fetcher = MockFetcher::new()
            .respond("b.jpg", 404, b"")
            .unreachable("never-matches");
        let ctx = StageContext {
            layout: &layout,
            client: &client,
            fetcher: &fetcher,
            config: &config,
        };

        let report = restore_photos(&ctx)?;
        assert_eq!(
            report,
            StageReport {
                processed: 3,
                succeeded: 1,
                failed: 2,
                skipped: 0
            }
        );
        assert!(!layout.restored().join("restored_a.jpg").exists());
        assert!(!layout.restored().join("restored_b.jpg").exists());
        assert!(layout.restored().join("restored_c.jpg").exists());
        Ok(())
    }

    #[test]
    fn test_transport_error_is_guarded() -> Result<()> {
        let (_temp_dir, layout, config) = setup()?;
        fs::write(layout.photos().join("a.jpg"), b"a")?;
        fs::write(layout.photos().join("b.jpg"), b"b")?;

        let client = MockInferenceClient::new();
        let fetcher = MockFetcher::new().unreachable("a.jpg");
        let ctx = StageContext {
            layout: &layout,
            client: &client,
            fetcher: &fetcher,
            config: &config,
        };

        let report = restore_photos(&ctx)?;
        assert_eq!(report.failed, 1);
        assert_eq!(report.succeeded, 1);
        Ok(())
    }

    #[test]
    fn test_abort_policy_stops_on_first_error() -> Result<()> {
        let (_temp_dir, layout, mut config) = setup()?;
        config.restore_policy = FailurePolicy::Abort;
        fs::write(layout.photos().join("a.jpg"), b"a")?;
        fs::write(layout.photos().join("b.jpg"), b"b")?;

        let client = MockInferenceClient::new().fail_on("a.jpg");
        let fetcher = MockFetcher::new();
        let ctx = StageContext {
            layout: &layout,
            client: &client,
            fetcher: &fetcher,
            config: &config,
        };

        assert!(restore_photos(&ctx).is_err());
        assert_eq!(client.calls().len(), 1);
        assert!(!layout.restored().join("restored_b.jpg").exists());
        Ok(())
    }

    #[test]
    fn test_rerun_overwrites_unless_skipping() -> Result<()> {
        let (_temp_dir, layout, mut config) = setup()?;
        fs::write(layout.photos().join("a.jpg"), b"a")?;
        let output = layout.restored().join("restored_a.jpg");
        fs::write(&output, b"stale")?;

        let client = MockInferenceClient::new();
        let fetcher = MockFetcher::new().respond("a.jpg", 200, b"fresh");

        config.skip_existing = true;
        let report = restore_photos(&StageContext {
            layout: &layout,
            client: &client,
            fetcher: &fetcher,
            config: &config,
        })?;
        assert_eq!(report.skipped, 1);
        assert_eq!(fs::read(&output)?, b"stale");

        config.skip_existing = false;
        restore_photos(&StageContext {
            layout: &layout,
            client: &client,
            fetcher: &fetcher,
            config: &config,
        })?;
        assert_eq!(fs::read(&output)?, b"fresh");
        Ok(())
    }
}
