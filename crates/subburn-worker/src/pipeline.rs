//! One attempt of the caption burn-in pipeline.
//!
//! Stages run strictly in order: stage input, probe, thumbnail, upload
//! thumbnail, render captions, burn, upload output. The first failure
//! aborts the attempt; the executor decides what happens next.

use std::path::Path;
use std::sync::Arc;
use tracing::warn;

use subburn_captions::{render_captions, TextMeasurer};
use subburn_media::Transcoder;
use subburn_queue::{CaptionJob, VideoSource};
use subburn_status::VideoStatusStore;
use subburn_storage::{ObjectKind, ObjectStore};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;
use crate::workspace::JobWorkspace;

/// Shared services for every job the pool runs.
#[derive(Clone)]
pub struct PipelineContext {
    pub config: WorkerConfig,
    pub transcoder: Arc<dyn Transcoder>,
    pub storage: Arc<dyn ObjectStore>,
    pub status: VideoStatusStore,
    pub measurer: Arc<dyn TextMeasurer>,
}

/// Public links produced by a successful attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOutput {
    pub output_link: String,
    pub thumbnail_link: String,
}

/// Run every stage for `job` inside `workspace`.
pub async fn run_attempt(
    ctx: &PipelineContext,
    job: &CaptionJob,
    workspace: &JobWorkspace,
    logger: &JobLogger,
) -> WorkerResult<PipelineOutput> {
    let source = workspace.source();
    stage_input(ctx, &job.source, &source).await?;
    logger.log_progress("source staged");

    let (width, height) = ctx.transcoder.probe_dimensions(&source).await?;
    logger.log_progress(&format!("probed {}x{}", width, height));

    let thumbnail = ctx
        .transcoder
        .extract_thumbnail(&source, &workspace.thumbnail())
        .await?;
    let thumbnail_name = format!("{}.jpg", job.video_id);
    let thumbnail_link = ctx
        .storage
        .upload_file(&thumbnail, ObjectKind::Thumbnail, job.owner_id.as_str(), Some(&thumbnail_name))
        .await?;
    logger.log_progress("thumbnail uploaded");

    let document = render_captions(
        &job.segments,
        &job.style,
        width,
        height,
        &ctx.config.segmenter,
        &ctx.config.layout,
        ctx.measurer.as_ref(),
    )?;
    let subtitles = workspace.subtitles();
    tokio::fs::write(&subtitles, document).await?;
    logger.log_progress("subtitle document written");

    let output = ctx
        .transcoder
        .burn_subtitles(&source, &subtitles, &workspace.output())
        .await?;
    logger.log_progress("captions burned");

    let output_name = format!("{}.mp4", job.video_id);
    let output_link = ctx
        .storage
        .upload_file(&output, ObjectKind::CaptionedVideo, job.owner_id.as_str(), Some(&output_name))
        .await?;
    logger.log_progress("output uploaded");

    Ok(PipelineOutput {
        output_link,
        thumbnail_link,
    })
}

/// Copy or download the source video to `dest`.
async fn stage_input(ctx: &PipelineContext, source: &VideoSource, dest: &Path) -> WorkerResult<()> {
    match source {
        VideoSource::Local { path } => {
            if !tokio::fs::try_exists(path).await.unwrap_or(false) {
                return Err(WorkerError::Media(subburn_media::MediaError::FileNotFound(path.clone())));
            }
            tokio::fs::copy(path, dest).await?;
        }
        VideoSource::Object { key } => {
            if let Err(e) = ctx.storage.download_file(key, dest).await {
                if e.is_missing() {
                    warn!("Source object {} is missing from storage", key);
                }
                return Err(e.into());
            }
        }
    }
    Ok(())
}
