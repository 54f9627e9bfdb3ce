//! Caption job submission handler.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::error::ApiResult;
use crate::extract::Owner;
use crate::services::{CaptionRequest, SubmissionService, SubmitResponse};
use crate::state::AppState;

use super::parse_video_id;

/// `POST /api/videos/:video_id/captions`
pub async fn submit_captions(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(video_id): Path<String>,
    Json(request): Json<CaptionRequest>,
) -> ApiResult<(StatusCode, Json<SubmitResponse>)> {
    let video_id = parse_video_id(video_id)?;
    let response = SubmissionService::from_state(&state)
        .submit(&owner, &video_id, request)
        .await?;
    Ok((StatusCode::ACCEPTED, Json(response)))
}
