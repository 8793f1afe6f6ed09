pub mod colorize;
pub mod config;
pub mod errors;
pub mod files;
pub mod imageops;
pub mod layout;
pub mod replicate;
pub mod restore;
pub mod stage;
pub mod traits;

pub mod mocks;

mod progress_tracker;

pub use config::{Config, FailurePolicy, ModelRef};
pub use errors::{RestoreError, Result};
pub use layout::FolderLayout;
pub use replicate::ReplicateClient;
pub use stage::StageReport;
pub use traits::*;

use colorize::colorize_photos;
use restore::restore_photos;
use stage::StageContext;

pub const BANNER: &str = "
Photo Restoration Suite
======================

This program will:
1. Colorize black & white photos from 'photos/bn/'
2. Convert red-tinted photos from 'photos/red/' to B&W and then colorize them
3. Restore all photos using GFPGAN

Required folder structure:
- photos/
  ├── bn/    (black & white photos)
  └── red/   (red-tinted photos)

Output folders:
- colorized/ (colorized versions)
- gfpgan/    (restored versions)
";

/// Counts from both stages of a completed run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub colorized: StageReport,
    pub restored: StageReport,
}

/// Runs the whole pipeline: folder setup, colorization, then restoration.
pub struct PhotoRestorer<C: InferenceClient, F: ImageFetcher> {
    client: C,
    fetcher: F,
    layout: FolderLayout,
    config: Config,
}

impl<C: InferenceClient, F: ImageFetcher> PhotoRestorer<C, F> {
    pub fn new(client: C, fetcher: F, config: Config) -> Self {
        Self {
            client,
            fetcher,
            layout: FolderLayout::new(&config.base_dir),
            config,
        }
    }

    pub fn layout(&self) -> &FolderLayout {
        &self.layout
    }

    /// Both stages always run, in order, even when the first wrote nothing.
    pub fn run(&self) -> Result<RunSummary> {
        println!("{}", BANNER);

        self.layout.ensure()?;

        let ctx = StageContext {
            layout: &self.layout,
            client: &self.client,
            fetcher: &self.fetcher,
            config: &self.config,
        };

        println!("\nStep 1: Colorizing photos...");
        let colorized = colorize_photos(&ctx)?;

        println!("\nStep 2: Restoring photos...");
        let restored = restore_photos(&ctx)?;

        println!(
            "\nProcessing complete! Check the 'colorized' and 'gfpgan' folders for results."
        );
        tracing::info!(?colorized, ?restored, "run finished");

        Ok(RunSummary {
            colorized,
            restored,
        })
    }
}

impl PhotoRestorer<ReplicateClient, ReplicateClient> {
    /// Uses one hosted-API client for both inference and downloads.
    pub fn with_replicate(config: Config) -> Result<Self> {
        let client = ReplicateClient::new(&config)?;
        Ok(Self::new(client.clone(), client, config))
    }
}
