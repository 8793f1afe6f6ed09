use std::path::PathBuf;
use thiserror::Error;

/// Structured error types for the restoration pipeline.
///
/// Each variant carries the context of its error domain (filesystem, image decoding,
/// remote service). Display output includes the underlying cause, since it is printed
/// as-is when a stage continues past a failed file.
#[derive(Error, Debug)]
pub enum RestoreError {
    #[error("Filesystem error: {operation} failed for {path:?}: {source}")]
    FileSystem {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Image processing error: {operation} failed (file: {path}): {source}")]
    ImageProcessing {
        path: String,
        operation: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Transport error: request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Prediction {id} {status}: {message}")]
    Prediction {
        id: String,
        status: String,
        message: String,
    },

    #[error("Invalid response: {operation} {reason}")]
    InvalidResponse { operation: String, reason: String },

    #[error("Validation error: {field} {reason}")]
    Validation { field: String, reason: String },
}

pub type Result<T> = std::result::Result<T, RestoreError>;

impl RestoreError {
    /// Wraps an I/O error with the path and operation it failed on.
    pub fn fs(path: impl Into<PathBuf>, operation: &str, source: std::io::Error) -> Self {
        Self::FileSystem {
            path: path.into(),
            operation: operation.to_string(),
            source,
        }
    }
}

/// Convert I/O errors to filesystem errors.
///
/// Fallback for errors raised without path context. Code that knows the path
/// should use [`RestoreError::fs`] instead.
impl From<std::io::Error> for RestoreError {
    fn from(err: std::io::Error) -> Self {
        Self::FileSystem {
            path: PathBuf::from("unknown"),
            operation: "unknown".to_string(),
            source: err,
        }
    }
}

/// Convert image crate errors to image processing errors.
impl From<image::ImageError> for RestoreError {
    fn from(err: image::ImageError) -> Self {
        Self::ImageProcessing {
            path: "unknown".to_string(),
            operation: "image processing".to_string(),
            source: Box::new(err),
        }
    }
}

/// Convert reqwest errors to transport errors, keeping the URL when reqwest knows it.
impl From<reqwest::Error> for RestoreError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport {
            url: err
                .url()
                .map(|u| u.to_string())
                .unwrap_or_else(|| "unknown".into()),
            source: err,
        }
    }
}
