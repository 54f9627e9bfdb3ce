//! Errors raised while moving source videos, captioned renders and thumbnails.

use thiserror::Error;

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum StorageError {
    /// Backend settings missing or rejected at startup
    #[error("Object storage not configured: {0}")]
    NotConfigured(String),

    /// Nothing stored under the key yet, e.g. a source upload still in flight
    #[error("No stored object at {0}")]
    MissingObject(String),

    /// Key segment that could leave its kind's prefix
    #[error("Refusing unsafe object key '{0}'")]
    UnsafeKey(String),

    #[error("Storing object failed: {0}")]
    PutFailed(String),

    #[error("Fetching object failed: {0}")]
    FetchFailed(String),

    #[error("Object store backend error: {0}")]
    Backend(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    pub fn not_configured(msg: impl Into<String>) -> Self {
        Self::NotConfigured(msg.into())
    }

    pub fn missing(key: impl Into<String>) -> Self {
        Self::MissingObject(key.into())
    }

    pub fn put_failed(msg: impl Into<String>) -> Self {
        Self::PutFailed(msg.into())
    }

    pub fn fetch_failed(msg: impl Into<String>) -> Self {
        Self::FetchFailed(msg.into())
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Self::MissingObject(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_key() {
        let err = StorageError::missing("videos/owner1/video1.mp4");
        assert!(err.is_missing());
        assert_eq!(err.to_string(), "No stored object at videos/owner1/video1.mp4");
        assert_eq!(
            StorageError::UnsafeKey("..".to_string()).to_string(),
            "Refusing unsafe object key '..'"
        );
        assert!(!StorageError::put_failed("503").is_missing());
    }
}
