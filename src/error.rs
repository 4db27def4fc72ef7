//! Error types for ndpix.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the ndpix library.
#[derive(Error, Debug)]
pub enum Error {
    /// Pixel type, image count, shape, option or name not handled.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// Failed to read an image file.
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write an image file.
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Codec rejected the pixels while encoding.
    #[error("failed to encode {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Embedded or user supplied JSON configuration is malformed.
    #[error("invalid configuration {name}: {source}")]
    Config {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported(_))
    }
}

/// Result type alias for ndpix operations.
pub type Result<T> = std::result::Result<T, Error>;
