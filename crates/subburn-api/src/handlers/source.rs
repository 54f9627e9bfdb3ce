//! Source video upload handler.

use std::io;
use std::path::Path as FsPath;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use futures_util::TryStreamExt;
use serde::{Deserialize, Serialize};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio_util::io::StreamReader;
use tracing::{info, warn};
use uuid::Uuid;

use subburn_storage::ObjectKind;

use crate::error::{ApiError, ApiResult};
use crate::extract::Owner;
use crate::metrics;
use crate::services::submission::default_source_key;
use crate::state::AppState;

use super::parse_video_id;

#[derive(Debug, Serialize, Deserialize)]
pub struct SourceUploadResponse {
    /// Object key to pass as `source_key` when submitting captions
    pub key: String,
    /// Public link the object will be served from once the upload finishes
    pub input_link: String,
}

/// `POST /api/videos/:video_id/source`
///
/// Spools the body to disk and uploads it in a tracked background task.
/// The response is sent before the upload completes.
pub async fn upload_source(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(video_id): Path<String>,
    body: Body,
) -> ApiResult<(StatusCode, Json<SourceUploadResponse>)> {
    let video_id = parse_video_id(video_id)?;
    let key = default_source_key(&owner, &video_id)?;

    tokio::fs::create_dir_all(&state.config.upload_dir)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to create upload dir: {}", e)))?;
    let spool = state.config.upload_dir.join(format!("{}.upload", Uuid::new_v4()));

    let written = match spool_body(body, &spool).await {
        Ok(n) => n,
        Err(e) => {
            remove_spool(&spool).await;
            metrics::record_source_upload("rejected");
            return Err(ApiError::bad_request(format!("Failed to read upload body: {}", e)));
        }
    };
    if written == 0 {
        remove_spool(&spool).await;
        metrics::record_source_upload("rejected");
        return Err(ApiError::bad_request("Empty upload body"));
    }

    info!(video_id = %video_id, bytes = written, "Source upload spooled");

    let storage = state.storage.clone();
    let name = format!("{}.mp4", video_id);
    let owner_id = owner.as_str().to_string();
    let upload_path = spool.clone();
    state.tasks.spawn("source_upload", async move {
        let result = storage
            .upload_file(&upload_path, ObjectKind::SourceVideo, &owner_id, Some(&name))
            .await;
        remove_spool(&upload_path).await;
        match &result {
            Ok(url) => {
                metrics::record_source_upload("stored");
                info!("Source video stored at {}", url);
            }
            Err(_) => metrics::record_source_upload("failed"),
        }
        result.map(|_| ())
    });

    let input_link = state.storage.public_url(&key);
    Ok((StatusCode::ACCEPTED, Json(SourceUploadResponse { key, input_link })))
}

async fn spool_body(body: Body, path: &FsPath) -> io::Result<u64> {
    let stream = body
        .into_data_stream()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e));
    let mut reader = StreamReader::new(stream);

    let file = File::create(path).await?;
    let mut writer = BufWriter::new(file);
    let written = tokio::io::copy(&mut reader, &mut writer).await?;
    writer.flush().await?;
    Ok(written)
}

async fn remove_spool(path: &FsPath) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != io::ErrorKind::NotFound {
            warn!("Failed to remove spooled upload {}: {}", path.display(), e);
        }
    }
}
