use std::fs;
use std::path::PathBuf;

use crate::errors::{RestoreError, Result};

/// Folders that must exist before any stage runs, relative to the base directory.
pub const REQUIRED_FOLDERS: [&str; 4] = ["photos/bn", "photos/red", "colorized", "gfpgan"];

/// The on-disk folder layout, resolved against a base directory.
#[derive(Debug, Clone)]
pub struct FolderLayout {
    base: PathBuf,
}

impl FolderLayout {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// Root scanned by the restoration stage.
    pub fn photos(&self) -> PathBuf {
        self.base.join("photos")
    }

    /// Black-and-white sources.
    pub fn bn(&self) -> PathBuf {
        self.photos().join("bn")
    }

    /// Red-tinted sources.
    pub fn red(&self) -> PathBuf {
        self.photos().join("red")
    }

    pub fn colorized(&self) -> PathBuf {
        self.base.join("colorized")
    }

    pub fn restored(&self) -> PathBuf {
        self.base.join("gfpgan")
    }

    /// Creates every missing required folder, parents included, and returns the
    /// ones that were created. Existing folders are left alone.
    pub fn ensure(&self) -> Result<Vec<PathBuf>> {
        let mut created = Vec::new();

        for folder in REQUIRED_FOLDERS {
            let path = self.base.join(folder);
            if path.exists() {
                continue;
            }

            fs::create_dir_all(&path)
                .map_err(|e| RestoreError::fs(&path, "create directory", e))?;
            println!("Created folder: {}", folder);
            created.push(path);
        }

        Ok(created)
    }
}
