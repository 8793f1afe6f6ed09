use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{RestoreError, Result};
use crate::files::{file_name_of, list_images, prefixed};
use crate::imageops::scratch::SCRATCH_PREFIX;
use crate::imageops::ScratchImage;
use crate::layout::FolderLayout;
use crate::progress_tracker::ProgressTracker;
use crate::stage::{handle_failure, Outcome, StageContext, StageReport};
use crate::traits::{ImageFetcher, InferenceClient};

pub const COLORIZE_INPUT_KEY: &str = "image";
pub const COLORIZED_PREFIX: &str = "colorized_";

/// Input folders of the colorization stage, in processing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFolder {
    /// Sent as-is.
    BlackAndWhite,
    /// Converted to grayscale first to strip the color cast.
    RedTinted,
}

impl SourceFolder {
    pub const ALL: [SourceFolder; 2] = [SourceFolder::BlackAndWhite, SourceFolder::RedTinted];

    pub const fn label(self) -> &'static str {
        match self {
            SourceFolder::BlackAndWhite => "bn",
            SourceFolder::RedTinted => "red",
        }
    }

    pub fn dir(self, layout: &FolderLayout) -> PathBuf {
        match self {
            SourceFolder::BlackAndWhite => layout.bn(),
            SourceFolder::RedTinted => layout.red(),
        }
    }

    /// Images to colorize from this folder. Grayscale copies left behind by an
    /// interrupted run share the red folder and are not inputs.
    pub fn images(self, layout: &FolderLayout) -> Vec<PathBuf> {
        let mut images = list_images(&self.dir(layout));
        if self == SourceFolder::RedTinted {
            images.retain(|path| !is_scratch_name(path));
        }
        images
    }
}

fn is_scratch_name(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|name| name.to_string_lossy().starts_with(SCRATCH_PREFIX))
}

/// Colorizes every image in `photos/bn` and `photos/red`.
///
/// Each result goes to `colorized/colorized_<name>` and is copied to
/// `photos/colorized_<name>` so that the restoration stage picks it up.
pub fn colorize_photos<C, F>(ctx: &StageContext<'_, C, F>) -> Result<StageReport>
where
    C: InferenceClient,
    F: ImageFetcher,
{
    let sources: Vec<(SourceFolder, PathBuf)> = SourceFolder::ALL
        .into_iter()
        .flat_map(|folder| {
            folder
                .images(ctx.layout)
                .into_iter()
                .map(move |path| (folder, path))
        })
        .collect();

    println!("\nFound {} images to colorize", sources.len());
    tracing::info!(count = sources.len(), "starting colorization");

    let tracker = ProgressTracker::new(sources.len(), "Colorizing images", !ctx.config.no_progress);
    let mut report = StageReport::default();

    for (folder, path) in &sources {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        tracker.println(format!("Processing {} from {} folder...", name, folder.label()));

        match colorize_one(ctx, *folder, path) {
            Ok(Outcome::Written) => report.succeeded += 1,
            Ok(Outcome::DownloadFailed(status)) => {
                report.failed += 1;
                tracker.println(format!(
                    "✗ Failed to download colorized image for {} (HTTP {})",
                    name, status
                ));
            }
            Ok(Outcome::Skipped) => {
                report.skipped += 1;
                tracker.println(format!("Skipping {}, already colorized", name));
            }
            Err(e) => handle_failure(
                ctx.config.colorize_policy,
                &tracker,
                &mut report,
                e,
                format!("Failed to colorize {}", name),
            )?,
        }

        tracker.advance();
    }

    tracker.finish();
    report.processed = tracker.position() as usize;
    Ok(report)
}

fn colorize_one<C, F>(
    ctx: &StageContext<'_, C, F>,
    folder: SourceFolder,
    input: &Path,
) -> Result<Outcome>
where
    C: InferenceClient,
    F: ImageFetcher,
{
    let file_name = file_name_of(input)?;
    let output = ctx.layout.colorized().join(prefixed(COLORIZED_PREFIX, file_name));
    let duplicate = ctx.layout.photos().join(prefixed(COLORIZED_PREFIX, file_name));

    if ctx.config.skip_existing && output.exists() && duplicate.exists() {
        return Ok(Outcome::Skipped);
    }

    // The scratch copy only has to outlive the remote call.
    let url = {
        let scratch = match folder {
            SourceFolder::BlackAndWhite => None,
            SourceFolder::RedTinted => Some(ScratchImage::grayscale_of(input)?),
        };
        let payload = scratch.as_ref().map_or(input, ScratchImage::path);
        ctx.client
            .run(&ctx.config.colorize_model, COLORIZE_INPUT_KEY, payload)?
    };

    let fetched = ctx.fetcher.fetch(&url)?;
    if !fetched.is_ok() {
        tracing::debug!(url = %url, status = fetched.status, "colorized download failed");
        return Ok(Outcome::DownloadFailed(fetched.status));
    }

    fs::write(&output, &fetched.bytes)
        .map_err(|e| RestoreError::fs(&output, "write colorized image", e))?;
    fs::copy(&output, &duplicate)
        .map_err(|e| RestoreError::fs(&duplicate, "copy colorized image into photos", e))?;

    Ok(Outcome::Written)
}
