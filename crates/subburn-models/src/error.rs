//! Model-level errors.

use thiserror::Error;

pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("Invalid hex color '{0}': expected #RRGGBB")]
    InvalidColor(String),

    #[error("Unknown font family: {0}")]
    UnknownFont(String),

    #[error("Invalid identifier '{0}': use 1-128 characters from [A-Za-z0-9_-]")]
    InvalidId(String),
}
