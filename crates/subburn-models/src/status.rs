//! Per-video status records.
//!
//! One record exists per (owner, video). It starts in the "processing"
//! shape `{status, input_link, timestamp}` and is overwritten once with the
//! terminal shape that also carries the output and thumbnail links.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::JobId;

/// Video processing status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum VideoStatus {
    /// Job accepted, pipeline running or waiting for a retry
    #[default]
    Processing,
    /// Captioned video uploaded
    Completed,
    /// Retry budget exhausted or job rejected by the worker
    Failed,
}

impl VideoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoStatus::Processing => "processing",
            VideoStatus::Completed => "completed",
            VideoStatus::Failed => "failed",
        }
    }

    /// Check if this is a terminal state (no more updates expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, VideoStatus::Completed | VideoStatus::Failed)
    }

    /// Whether a record in `self` may be replaced by one in `next` for the same job.
    pub fn can_transition_to(&self, next: VideoStatus) -> bool {
        matches!(
            (self, next),
            (VideoStatus::Processing, _)
        )
    }
}

impl fmt::Display for VideoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Latest known state of one video's captioning job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VideoStatusRecord {
    /// Job that wrote this record
    pub job_id: JobId,
    pub status: VideoStatus,
    /// Link to the uploaded source video
    pub input_link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_link: Option<String>,
    /// Last failure message, only on failed records
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl VideoStatusRecord {
    pub fn processing(job_id: JobId, input_link: impl Into<String>) -> Self {
        Self {
            job_id,
            status: VideoStatus::Processing,
            input_link: input_link.into(),
            output_link: None,
            thumbnail_link: None,
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn completed(
        job_id: JobId,
        input_link: impl Into<String>,
        output_link: impl Into<String>,
        thumbnail_link: impl Into<String>,
    ) -> Self {
        Self {
            job_id,
            status: VideoStatus::Completed,
            input_link: input_link.into(),
            output_link: Some(output_link.into()),
            thumbnail_link: Some(thumbnail_link.into()),
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn failed(job_id: JobId, input_link: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            job_id,
            status: VideoStatus::Failed,
            input_link: input_link.into(),
            output_link: None,
            thumbnail_link: None,
            error: Some(error.into()),
            timestamp: Utc::now(),
        }
    }

    /// Check if the record is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Long-lived link record kept after a successful job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct OutputLinkRecord {
    pub input_link: String,
    pub output_link: String,
    pub thumbnail_link: String,
    pub timestamp: DateTime<Utc>,
}

impl OutputLinkRecord {
    pub fn new(
        input_link: impl Into<String>,
        output_link: impl Into<String>,
        thumbnail_link: impl Into<String>,
    ) -> Self {
        Self {
            input_link: input_link.into(),
            output_link: output_link.into(),
            thumbnail_link: thumbnail_link.into(),
            timestamp: Utc::now(),
        }
    }
}
