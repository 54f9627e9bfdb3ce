//! Worker error types.

use std::time::Duration;
use thiserror::Error;

use subburn_queue::QueueError;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Invalid job: {0}")]
    InvalidJob(String),

    #[error("Attempt timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Media error: {0}")]
    Media(#[from] subburn_media::MediaError),

    #[error("Caption error: {0}")]
    Captions(#[from] subburn_captions::CaptionError),

    #[error("Storage error: {0}")]
    Storage(#[from] subburn_storage::StorageError),

    #[error("Status store error: {0}")]
    Status(#[from] subburn_status::StatusError),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn invalid_job(msg: impl Into<String>) -> Self {
        Self::InvalidJob(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Check if error is retryable.
    ///
    /// Failures that would repeat identically on the same input (bad
    /// payloads, caption rendering errors) are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            WorkerError::InvalidJob(_) | WorkerError::ConfigError(_) | WorkerError::Captions(_) => false,
            WorkerError::Queue(QueueError::InvalidJob(_) | QueueError::UnsupportedSchema(_)) => false,
            WorkerError::Timeout(_)
            | WorkerError::Media(_)
            | WorkerError::Storage(_)
            | WorkerError::Status(_)
            | WorkerError::Queue(_)
            | WorkerError::Io(_) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use subburn_media::MediaError;
    use subburn_storage::StorageError;

    #[test]
    fn test_retryable_classification() {
        assert!(WorkerError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(WorkerError::from(MediaError::ffmpeg_failed("encode", None, Some(1))).is_retryable());
        assert!(WorkerError::from(StorageError::put_failed("503")).is_retryable());
        assert!(!WorkerError::invalid_job("bad").is_retryable());
        assert!(!WorkerError::from(QueueError::UnsupportedSchema(7)).is_retryable());
        assert!(!WorkerError::from(subburn_captions::CaptionError::InvalidDimensions { width: 0, height: 0 })
            .is_retryable());
    }

    #[test]
    fn test_timeout_message() {
        let err = WorkerError::Timeout(Duration::from_secs(1800));
        assert_eq!(err.to_string(), "Attempt timed out after 1800s");
    }
}
