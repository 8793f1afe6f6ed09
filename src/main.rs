use anyhow::{ensure, Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use photo_restore::{Config, PhotoRestorer};

fn main() -> Result<()> {
    // Diagnostics go to stderr; stdout carries the operator messages.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "photo_restore=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::parse();

    ensure!(
        config.base_dir.is_dir(),
        "Base directory does not exist: {}",
        config.base_dir.display()
    );

    let restorer =
        PhotoRestorer::with_replicate(config).context("Failed to set up the inference client")?;
    let summary = restorer.run().context("Photo restoration aborted")?;

    tracing::info!(
        colorized = summary.colorized.succeeded,
        restored = summary.restored.succeeded,
        "done"
    );

    Ok(())
}
