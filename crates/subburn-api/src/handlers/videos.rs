//! Video status and listing handlers.

use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use subburn_models::{JobId, OutputLinkRecord, VideoId, VideoStatus, VideoStatusRecord};

use crate::error::{ApiError, ApiResult};
use crate::extract::Owner;
use crate::state::AppState;

use super::parse_video_id;

/// Status of one video as returned to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoStatusResponse {
    pub video_id: VideoId,
    pub status: VideoStatus,
    /// Absent when only the long-lived output link survived
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<JobId>,
    pub input_link: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl VideoStatusResponse {
    fn from_record(video_id: VideoId, record: VideoStatusRecord) -> Self {
        Self {
            video_id,
            status: record.status,
            job_id: Some(record.job_id),
            input_link: record.input_link,
            output_link: record.output_link,
            thumbnail_link: record.thumbnail_link,
            error: record.error,
            timestamp: record.timestamp,
        }
    }

    fn from_output_link(video_id: VideoId, link: OutputLinkRecord) -> Self {
        Self {
            video_id,
            status: VideoStatus::Completed,
            job_id: None,
            input_link: link.input_link,
            output_link: Some(link.output_link),
            thumbnail_link: Some(link.thumbnail_link),
            error: None,
            timestamp: link.timestamp,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListVideosResponse {
    pub processing: Vec<VideoStatusResponse>,
    pub completed: Vec<VideoStatusResponse>,
}

/// `GET /api/videos/:video_id/status`
///
/// Falls back to the output-link record once the status record has expired.
pub async fn get_video_status(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(video_id): Path<String>,
) -> ApiResult<Json<VideoStatusResponse>> {
    let video_id = parse_video_id(video_id)?;

    if let Some(record) = state.status.get_status(&owner, &video_id).await? {
        return Ok(Json(VideoStatusResponse::from_record(video_id, record)));
    }

    match state.status.get_output_link(&owner, &video_id).await? {
        Some(link) => Ok(Json(VideoStatusResponse::from_output_link(video_id, link))),
        None => Err(ApiError::not_found(format!("No status for video {}", video_id))),
    }
}

/// `GET /api/videos`
pub async fn list_videos(
    State(state): State<AppState>,
    Owner(owner): Owner,
) -> ApiResult<Json<ListVideosResponse>> {
    let mut processing: Vec<VideoStatusResponse> = state
        .status
        .list_processing(&owner)
        .await?
        .into_iter()
        .map(|(video, record)| VideoStatusResponse::from_record(video, record))
        .collect();

    let mut completed: Vec<VideoStatusResponse> = state
        .status
        .list_completed(&owner)
        .await?
        .into_iter()
        .map(|(video, link)| VideoStatusResponse::from_output_link(video, link))
        .collect();

    // Newest first
    processing.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    completed.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    Ok(Json(ListVideosResponse { processing, completed }))
}
