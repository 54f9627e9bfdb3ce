//! Job payload carried on the queue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use validator::Validate;

use subburn_models::{is_valid_id, JobId, OwnerId, SubtitleStyle, TranscriptionSegment, VideoId};

use crate::error::{QueueError, QueueResult};

/// Payload schema version written by this build.
pub const JOB_SCHEMA_VERSION: u32 = 1;

fn default_schema_version() -> u32 {
    JOB_SCHEMA_VERSION
}

fn default_attempt() -> u32 {
    1
}

/// Where the worker finds the source video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VideoSource {
    /// File on a filesystem shared with the worker
    Local { path: PathBuf },
    /// Object key in the object store
    Object { key: String },
}

/// Exponential backoff policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 5_000,
            max_delay_ms: 300_000,
        }
    }
}

impl RetryPolicy {
    /// Create policy from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_attempts: std::env::var("RETRY_MAX_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n: &u32| *n >= 1)
                .unwrap_or(defaults.max_attempts),
            base_delay_ms: std::env::var("RETRY_BASE_DELAY_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.base_delay_ms),
            max_delay_ms: std::env::var("RETRY_MAX_DELAY_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_delay_ms),
        }
    }

    /// Delay before the attempt that follows failed attempt `attempt` (1-based):
    /// `base × 2^(attempt − 1)`, capped at `max_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(63);
        let factor = 1u64.checked_shl(exponent).unwrap_or(u64::MAX);
        let delay = self.base_delay_ms.saturating_mul(factor).min(self.max_delay_ms);
        Duration::from_millis(delay)
    }

    /// Whether another attempt is allowed after `attempt` failed.
    pub fn allows_retry_after(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

/// Request to burn captions into one video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionJob {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub job_id: JobId,
    pub owner_id: OwnerId,
    pub video_id: VideoId,
    pub source: VideoSource,
    /// Link recorded on the status record and preserved on failure
    pub input_link: String,
    pub segments: Vec<TranscriptionSegment>,
    pub style: SubtitleStyle,
    /// 1-based attempt number of this delivery
    #[serde(default = "default_attempt")]
    pub attempt: u32,
    #[serde(default)]
    pub retry: RetryPolicy,
    pub created_at: DateTime<Utc>,
}

impl CaptionJob {
    /// Create a first-attempt job.
    pub fn new(
        owner_id: OwnerId,
        video_id: VideoId,
        source: VideoSource,
        input_link: impl Into<String>,
        segments: Vec<TranscriptionSegment>,
        style: SubtitleStyle,
    ) -> Self {
        Self {
            schema_version: JOB_SCHEMA_VERSION,
            job_id: JobId::new(),
            owner_id,
            video_id,
            source,
            input_link: input_link.into(),
            segments,
            style,
            attempt: 1,
            retry: RetryPolicy::default(),
            created_at: Utc::now(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Copy of this job for the next attempt.
    pub fn next_attempt(&self) -> Self {
        Self {
            attempt: self.attempt.saturating_add(1),
            ..self.clone()
        }
    }

    /// Generate idempotency key for deduplication.
    pub fn idempotency_key(&self) -> String {
        format!("captions:{}:{}:{}", self.owner_id, self.video_id, self.job_id)
    }

    /// Decode a payload, rejecting schema versions this build does not know.
    pub fn decode(payload: &str) -> QueueResult<Self> {
        let job: Self = serde_json::from_str(payload)?;
        if job.schema_version != JOB_SCHEMA_VERSION {
            return Err(QueueError::UnsupportedSchema(job.schema_version));
        }
        Ok(job)
    }

    pub fn encode(&self) -> QueueResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Check ids, segments and style. Failures here are never worth retrying.
    pub fn validate(&self) -> QueueResult<()> {
        if self.schema_version != JOB_SCHEMA_VERSION {
            return Err(QueueError::UnsupportedSchema(self.schema_version));
        }
        for (name, id) in [
            ("job_id", self.job_id.as_str()),
            ("owner_id", self.owner_id.as_str()),
            ("video_id", self.video_id.as_str()),
        ] {
            if !is_valid_id(id) {
                return Err(QueueError::invalid_job(format!("invalid {}: {:?}", name, id)));
            }
        }
        if self.attempt == 0 {
            return Err(QueueError::invalid_job("attempt must start at 1"));
        }
        if self.segments.is_empty() {
            return Err(QueueError::invalid_job("no transcription segments"));
        }
        for segment in &self.segments {
            segment
                .validate()
                .map_err(|e| QueueError::invalid_job(format!("segment {}: {}", segment.id, e)))?;
        }
        self.style
            .validate()
            .map_err(|e| QueueError::invalid_job(format!("style: {}", e)))?;
        if let VideoSource::Object { key } = &self.source {
            if key.is_empty() {
                return Err(QueueError::invalid_job("empty source key"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> CaptionJob {
        CaptionJob::new(
            OwnerId::from("owner1"),
            VideoId::from("video1"),
            VideoSource::Object {
                key: "videos/video1/source.mp4".to_string(),
            },
            "https://cdn.example.com/videos/video1/source.mp4",
            vec![TranscriptionSegment::new(0, 0.0, 1.5, "hello world")],
            SubtitleStyle::default(),
        )
    }

    #[test]
    fn test_backoff_doubles_then_caps() {
        let policy = RetryPolicy {
            max_attempts: 10,
            base_delay_ms: 1_000,
            max_delay_ms: 5_000,
        };
        assert_eq!(policy.delay_for_attempt(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_secs(2));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_secs(4));
        assert_eq!(policy.delay_for_attempt(4), Duration::from_secs(5));
        assert_eq!(policy.delay_for_attempt(200), Duration::from_secs(5));
    }

    #[test]
    fn test_backoff_is_monotonic() {
        let policy = RetryPolicy::default();
        let delays: Vec<Duration> = (1..=70).map(|n| policy.delay_for_attempt(n)).collect();
        assert!(delays.windows(2).all(|w| w[0] <= w[1]));
        assert!(delays.iter().all(|d| *d <= Duration::from_millis(policy.max_delay_ms)));
    }

    #[test]
    fn test_retry_budget() {
        let policy = RetryPolicy::default();
        assert!(policy.allows_retry_after(1));
        assert!(policy.allows_retry_after(2));
        assert!(!policy.allows_retry_after(3));
    }

    #[test]
    fn test_next_attempt_keeps_identity() {
        let first = job();
        let second = first.next_attempt();
        assert_eq!(second.attempt, 2);
        assert_eq!(second.job_id, first.job_id);
        assert_eq!(second.idempotency_key(), first.idempotency_key());
    }

    #[test]
    fn test_decode_rejects_unknown_schema() {
        let mut value = serde_json::to_value(job()).unwrap();
        value["schema_version"] = serde_json::json!(99);
        let err = CaptionJob::decode(&value.to_string()).unwrap_err();
        assert!(matches!(err, QueueError::UnsupportedSchema(99)));
    }

    #[test]
    fn test_decode_defaults_attempt_and_retry() {
        let mut value = serde_json::to_value(job()).unwrap();
        let obj = value.as_object_mut().unwrap();
        obj.remove("attempt");
        obj.remove("retry");
        obj.remove("schema_version");
        let decoded = CaptionJob::decode(&value.to_string()).unwrap();
        assert_eq!(decoded.attempt, 1);
        assert_eq!(decoded.retry, RetryPolicy::default());
    }

    #[test]
    fn test_validate() {
        assert!(job().validate().is_ok());

        let mut bad = job();
        bad.owner_id = OwnerId::from("owner:1");
        assert!(matches!(bad.validate(), Err(QueueError::InvalidJob(_))));

        let mut bad = job();
        bad.segments[0].end = bad.segments[0].start;
        assert!(matches!(bad.validate(), Err(QueueError::InvalidJob(_))));

        let mut bad = job();
        bad.segments.clear();
        assert!(bad.validate().is_err());

        let mut bad = job();
        bad.style.font_size_px = 2;
        assert!(bad.validate().is_err());
    }
}
