//! Video status store.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use subburn_models::{JobId, OutputLinkRecord, OwnerId, VideoId, VideoStatus, VideoStatusRecord};

use crate::error::StatusResult;
use crate::kv::KeyValueStore;

/// Status store configuration.
#[derive(Debug, Clone)]
pub struct StatusConfig {
    /// TTL applied on every write of the status record
    pub status_ttl: Duration,
    /// TTL of the output-link record written on success
    pub output_link_ttl: Duration,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            status_ttl: Duration::from_secs(3600),
            output_link_ttl: Duration::from_secs(7 * 24 * 3600),
        }
    }
}

impl StatusConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            status_ttl: std::env::var("STATUS_TTL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.status_ttl),
            output_link_ttl: std::env::var("OUTPUT_LINK_TTL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.output_link_ttl),
        }
    }
}

pub fn status_key(owner: &OwnerId, video: &VideoId) -> String {
    format!("owner:{}:video:{}:status", owner, video)
}

pub fn output_link_key(owner: &OwnerId, video: &VideoId) -> String {
    format!("owner:{}:video:{}:output_link", owner, video)
}

/// Extract the video id from a key built by [`status_key`] or [`output_link_key`].
fn video_from_key(owner: &OwnerId, key: &str, suffix: &str) -> Option<VideoId> {
    let prefix = format!("owner:{}:video:", owner);
    key.strip_prefix(&prefix)
        .and_then(|rest| rest.strip_suffix(suffix))
        .filter(|video| !video.is_empty() && !video.contains(':'))
        .map(VideoId::from)
}

/// Reads and writes per-video status records.
///
/// Writes for one job are monotonic: once a job's record is terminal, later
/// writes from that same job are ignored. A record written by a different
/// (newer) job always replaces it.
#[derive(Clone)]
pub struct VideoStatusStore {
    kv: Arc<dyn KeyValueStore>,
    config: StatusConfig,
}

impl VideoStatusStore {
    pub fn new(kv: Arc<dyn KeyValueStore>, config: StatusConfig) -> Self {
        Self { kv, config }
    }

    pub fn config(&self) -> &StatusConfig {
        &self.config
    }

    pub async fn get_status(
        &self,
        owner: &OwnerId,
        video: &VideoId,
    ) -> StatusResult<Option<VideoStatusRecord>> {
        self.read_json(&status_key(owner, video)).await
    }

    pub async fn get_output_link(
        &self,
        owner: &OwnerId,
        video: &VideoId,
    ) -> StatusResult<Option<OutputLinkRecord>> {
        self.read_json(&output_link_key(owner, video)).await
    }

    /// Record that `job` has been accepted for `video`.
    pub async fn mark_processing(
        &self,
        owner: &OwnerId,
        video: &VideoId,
        job: &JobId,
        input_link: &str,
    ) -> StatusResult<VideoStatusRecord> {
        let record = VideoStatusRecord::processing(job.clone(), input_link);
        self.write_if_allowed(owner, video, record).await
    }

    /// Re-arm the TTL of `job`'s processing record at the start of each attempt.
    ///
    /// An expired record is rewritten. A record owned by another job, or a
    /// terminal record of this job, is left alone and returned as `None`.
    pub async fn refresh_processing(
        &self,
        owner: &OwnerId,
        video: &VideoId,
        job: &JobId,
        input_link: &str,
    ) -> StatusResult<Option<VideoStatusRecord>> {
        let record = match self.get_status(owner, video).await? {
            Some(existing) if existing.job_id != *job => {
                debug!(job_id = %job, owner_job = %existing.job_id, "Status owned by a newer job, not refreshing");
                return Ok(None);
            }
            Some(existing) if existing.status.is_terminal() => return Ok(None),
            Some(existing) => existing,
            None => {
                warn!(job_id = %job, "Processing record expired before attempt start, rewriting");
                VideoStatusRecord::processing(job.clone(), input_link)
            }
        };
        self.write_if_allowed(owner, video, record).await.map(Some)
    }

    /// Record success and keep the output link around for longer.
    pub async fn mark_completed(
        &self,
        owner: &OwnerId,
        video: &VideoId,
        job: &JobId,
        input_link: &str,
        output_link: &str,
        thumbnail_link: &str,
    ) -> StatusResult<VideoStatusRecord> {
        let input_link = self.known_input_link(owner, video, job, input_link).await?;
        let record = VideoStatusRecord::completed(job.clone(), &input_link, output_link, thumbnail_link);
        let written = self.write_if_allowed(owner, video, record).await?;

        if written.job_id == *job && written.status == VideoStatus::Completed {
            let link = OutputLinkRecord::new(input_link, output_link, thumbnail_link);
            let json = serde_json::to_string(&link)?;
            self.kv
                .set(&output_link_key(owner, video), &json, Some(self.config.output_link_ttl))
                .await?;
        }
        Ok(written)
    }

    /// Record a terminal failure. The input link of the processing record is kept.
    pub async fn mark_failed(
        &self,
        owner: &OwnerId,
        video: &VideoId,
        job: &JobId,
        input_link: &str,
        error: &str,
    ) -> StatusResult<VideoStatusRecord> {
        let input_link = self.known_input_link(owner, video, job, input_link).await?;
        let record = VideoStatusRecord::failed(job.clone(), input_link, error);
        self.write_if_allowed(owner, video, record).await
    }

    /// Videos of `owner` whose latest record is still processing.
    pub async fn list_processing(
        &self,
        owner: &OwnerId,
    ) -> StatusResult<Vec<(VideoId, VideoStatusRecord)>> {
        let pattern = format!("owner:{}:video:*:status", owner);
        let mut out = Vec::new();
        for key in self.kv.scan(&pattern).await? {
            let Some(video) = video_from_key(owner, &key, ":status") else {
                continue;
            };
            if let Some(record) = self.read_json::<VideoStatusRecord>(&key).await? {
                if record.status == VideoStatus::Processing {
                    out.push((video, record));
                }
            }
        }
        Ok(out)
    }

    /// Videos of `owner` with a live output-link record.
    pub async fn list_completed(
        &self,
        owner: &OwnerId,
    ) -> StatusResult<Vec<(VideoId, OutputLinkRecord)>> {
        let pattern = format!("owner:{}:video:*:output_link", owner);
        let mut out = Vec::new();
        for key in self.kv.scan(&pattern).await? {
            let Some(video) = video_from_key(owner, &key, ":output_link") else {
                continue;
            };
            if let Some(record) = self.read_json::<OutputLinkRecord>(&key).await? {
                out.push((video, record));
            }
        }
        Ok(out)
    }

    pub async fn ping(&self) -> StatusResult<()> {
        self.kv.ping().await
    }

    async fn known_input_link(
        &self,
        owner: &OwnerId,
        video: &VideoId,
        job: &JobId,
        fallback: &str,
    ) -> StatusResult<String> {
        Ok(match self.get_status(owner, video).await? {
            Some(existing) if existing.job_id == *job => existing.input_link,
            _ => fallback.to_string(),
        })
    }

    async fn write_if_allowed(
        &self,
        owner: &OwnerId,
        video: &VideoId,
        record: VideoStatusRecord,
    ) -> StatusResult<VideoStatusRecord> {
        let key = status_key(owner, video);

        if let Some(existing) = self.read_json::<VideoStatusRecord>(&key).await? {
            if existing.job_id == record.job_id && !existing.status.can_transition_to(record.status) {
                warn!(
                    job_id = %record.job_id,
                    current = %existing.status,
                    attempted = %record.status,
                    "Ignoring status write for job already in a terminal state"
                );
                return Ok(existing);
            }
        }

        let json = serde_json::to_string(&record)?;
        self.kv.set(&key, &json, Some(self.config.status_ttl)).await?;
        debug!(job_id = %record.job_id, status = %record.status, "Wrote status for {}", key);
        Ok(record)
    }

    async fn read_json<T: serde::de::DeserializeOwned>(&self, key: &str) -> StatusResult<Option<T>> {
        match self.kv.get(key).await? {
            Some(raw) => match serde_json::from_str(&raw) {
                Ok(value) => Ok(Some(value)),
                Err(e) => {
                    warn!("Discarding unreadable record at {}: {}", key, e);
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }
}
