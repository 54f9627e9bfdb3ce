//! Caption job submission.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use validator::Validate;

use subburn_models::{JobId, OwnerId, SubtitleStyle, TranscriptionSegment, VideoId, VideoStatus};
use subburn_queue::{CaptionJob, JobBroker, RetryPolicy, VideoSource};
use subburn_status::VideoStatusStore;
use subburn_storage::{object_key, ObjectKind, ObjectStore};

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

/// Body of `POST /api/videos/:video_id/captions`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CaptionRequest {
    /// Public link to the uncaptioned video, echoed back in status records
    #[validate(length(min = 1, max = 2048))]
    pub input_link: String,

    /// Object key of the source video; defaults to the key the source upload writes
    #[serde(default)]
    #[validate(length(min = 1, max = 512))]
    pub source_key: Option<String>,

    #[validate(length(min = 1, max = 5000), nested)]
    pub segments: Vec<TranscriptionSegment>,

    #[serde(default)]
    #[validate(nested)]
    pub style: SubtitleStyle,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub job_id: JobId,
    pub video_id: VideoId,
    pub status: VideoStatus,
}

/// Key the source upload endpoint writes for `video`.
pub fn default_source_key(owner: &OwnerId, video: &VideoId) -> ApiResult<String> {
    Ok(object_key(
        ObjectKind::SourceVideo,
        owner.as_str(),
        Some(&format!("{}.mp4", video)),
    )?)
}

fn validate_source_key(key: &str) -> ApiResult<()> {
    if key.starts_with('/') || key.split('/').any(|s| s.is_empty() || s == "." || s == "..") {
        return Err(ApiError::bad_request(format!("Invalid source_key: {}", key)));
    }
    Ok(())
}

/// Validates requests, records them as processing and enqueues them.
pub struct SubmissionService {
    status: VideoStatusStore,
    broker: Arc<dyn JobBroker>,
    storage: Arc<dyn ObjectStore>,
    retry: RetryPolicy,
}

impl SubmissionService {
    pub fn new(
        status: VideoStatusStore,
        broker: Arc<dyn JobBroker>,
        storage: Arc<dyn ObjectStore>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            status,
            broker,
            storage,
            retry,
        }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(
            state.status.clone(),
            Arc::clone(&state.broker),
            Arc::clone(&state.storage),
            state.retry.clone(),
        )
    }

    /// Accept a caption job for `video`.
    ///
    /// The source object must already be stored; a submission racing a
    /// background source upload gets a 409 and can be retried. The processing
    /// record is written before the job is enqueued, so a worker never sees a
    /// job whose status is missing. If the enqueue fails the record is turned
    /// into a failed one.
    pub async fn submit(
        &self,
        owner: &OwnerId,
        video: &VideoId,
        request: CaptionRequest,
    ) -> ApiResult<SubmitResponse> {
        if let Err(e) = request.validate() {
            metrics::record_submission_rejected("validation");
            return Err(e.into());
        }
        if let Err(e) = url::Url::parse(&request.input_link) {
            metrics::record_submission_rejected("validation");
            return Err(ApiError::bad_request(format!("Invalid input_link: {}", e)));
        }

        let source_key = match request.source_key {
            Some(key) => {
                validate_source_key(&key)?;
                key
            }
            None => default_source_key(owner, video)?,
        };

        if !self.storage.exists(&source_key).await? {
            metrics::record_submission_rejected("source_missing");
            return Err(ApiError::conflict(format!(
                "Source video {} has not finished uploading",
                source_key
            )));
        }

        if let Some(existing) = self.status.get_status(owner, video).await? {
            if existing.status == VideoStatus::Processing {
                metrics::record_submission_rejected("conflict");
                return Err(ApiError::conflict(format!(
                    "Video {} is already being processed by job {}",
                    video, existing.job_id
                )));
            }
        }

        let job = CaptionJob::new(
            owner.clone(),
            video.clone(),
            VideoSource::Object { key: source_key },
            request.input_link,
            request.segments,
            request.style,
        )
        .with_retry(self.retry.clone());
        job.validate().map_err(|e| ApiError::bad_request(e.to_string()))?;

        self.status
            .mark_processing(owner, video, &job.job_id, &job.input_link)
            .await?;

        if let Err(e) = self.broker.enqueue(&job).await {
            metrics::record_submission_rejected("enqueue");
            let message = format!("Failed to enqueue job: {}", e);
            if let Err(status_err) = self
                .status
                .mark_failed(owner, video, &job.job_id, &job.input_link, &message)
                .await
            {
                warn!(job_id = %job.job_id, "Could not record enqueue failure: {}", status_err);
            }
            return Err(e.into());
        }

        metrics::record_job_submitted();
        info!(
            job_id = %job.job_id,
            video_id = %video,
            segments = job.segments.len(),
            "Caption job submitted"
        );

        Ok(SubmitResponse {
            job_id: job.job_id,
            video_id: video.clone(),
            status: VideoStatus::Processing,
        })
    }
}
