//! Image discovery and output naming.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::errors::{RestoreError, Result};

/// Extensions (lowercase) accepted as input images.
pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Matches on the file name's suffix, so a bare `.png` counts as a PNG.
pub fn is_supported_image(path: &Path) -> bool {
    let Some(name) = path.file_name() else {
        return false;
    };
    let name = name.to_string_lossy().to_lowercase();
    SUPPORTED_EXTENSIONS
        .iter()
        .any(|ext| name.strip_suffix(ext).is_some_and(|stem| stem.ends_with('.')))
}

/// Every supported image at any depth under `root`, sorted by file name within
/// each directory. A missing root yields an empty list. Symlinked files are
/// included; symlinked directories are not entered.
pub fn collect_images(root: &Path) -> Vec<PathBuf> {
    walk_images(WalkDir::new(root))
}

/// Supported images directly inside `dir`; subdirectories are not entered.
pub fn list_images(dir: &Path) -> Vec<PathBuf> {
    walk_images(WalkDir::new(dir).min_depth(1).max_depth(1))
}

fn walk_images(walker: WalkDir) -> Vec<PathBuf> {
    walker
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        // `path().is_file()` resolves file symlinks, which `file_type()` does not.
        .filter(|e| e.path().is_file())
        .filter(|e| is_supported_image(e.path()))
        .map(|e| e.into_path())
        .collect()
}

/// `<prefix><file name>`, preserving non-UTF-8 names.
pub fn prefixed(prefix: &str, file_name: &OsStr) -> OsString {
    let mut name = OsString::from(prefix);
    name.push(file_name);
    name
}

pub fn file_name_of(path: &Path) -> Result<&OsStr> {
    path.file_name().ok_or_else(|| RestoreError::Validation {
        field: path.display().to_string(),
        reason: "has no file name".to_string(),
    })
}

/// Maps `root/<sub>/<name>` to `out_root/<sub>/<prefix><name>`.
pub fn mirrored_output_path(
    input: &Path,
    root: &Path,
    out_root: &Path,
    prefix: &str,
) -> Result<PathBuf> {
    let relative = input
        .strip_prefix(root)
        .map_err(|_| RestoreError::Validation {
            field: input.display().to_string(),
            reason: format!("is not inside {}", root.display()),
        })?;
    let file_name = file_name_of(relative)?;
    let parent = relative.parent().unwrap_or(Path::new(""));

    Ok(out_root.join(parent).join(prefixed(prefix, file_name)))
}
