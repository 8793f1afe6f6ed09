use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::errors::{RestoreError, Result};
use crate::files::{file_name_of, prefixed};
use crate::imageops::grayscale::to_grayscale_rgb;

pub const SCRATCH_PREFIX: &str = "temp_bw_";

/// A grayscale copy of a source image, written next to it as `temp_bw_<name>`.
///
/// The file is removed when the guard is dropped, on success and error paths alike.
#[derive(Debug)]
pub struct ScratchImage {
    path: PathBuf,
}

impl ScratchImage {
    pub fn grayscale_of(source: &Path) -> Result<Self> {
        let name = file_name_of(source)?;
        let dir = source.parent().unwrap_or(Path::new(""));
        let gray = to_grayscale_rgb(source)?;

        // Guard first so a half-written file is cleaned up too.
        let scratch = Self {
            path: dir.join(prefixed(SCRATCH_PREFIX, name)),
        };
        gray.save(&scratch.path)
            .map_err(|e| RestoreError::ImageProcessing {
                path: scratch.path.display().to_string(),
                operation: "save grayscale copy".to_string(),
                source: Box::new(e),
            })?;

        Ok(scratch)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchImage {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "removed scratch image"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "failed to remove scratch image"
            ),
        }
    }
}
