//! Caption pipeline errors.

use std::path::PathBuf;
use thiserror::Error;

pub type CaptionResult<T> = Result<T, CaptionError>;

#[derive(Debug, Error)]
pub enum CaptionError {
    #[error("Invalid video dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Failed to load font {path}: {message}")]
    FontLoad { path: PathBuf, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CaptionError {
    pub fn font_load(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::FontLoad {
            path: path.into(),
            message: message.into(),
        }
    }
}
