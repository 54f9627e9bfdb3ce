//! Transcoder abstraction used by the worker pipeline.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::burn::{burn_subtitles, EncodeSettings};
use crate::command::FfmpegRunner;
use crate::error::MediaResult;
use crate::probe::probe_dimensions;
use crate::thumbnail::extract_thumbnail;

/// External media tooling as seen by one job attempt.
#[async_trait]
pub trait Transcoder: Send + Sync {
    async fn probe_dimensions(&self, video: &Path) -> MediaResult<(u32, u32)>;

    async fn extract_thumbnail(&self, video: &Path, output: &Path) -> MediaResult<PathBuf>;

    async fn burn_subtitles(&self, video: &Path, subtitles: &Path, output: &Path) -> MediaResult<PathBuf>;
}

/// [`Transcoder`] backed by the `ffprobe` and `ffmpeg` binaries.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    settings: EncodeSettings,
    timeout_secs: u64,
}

impl FfmpegTranscoder {
    pub fn new(settings: EncodeSettings, timeout_secs: u64) -> Self {
        Self {
            settings,
            timeout_secs,
        }
    }

    fn runner(&self) -> FfmpegRunner {
        FfmpegRunner::new().with_timeout(self.timeout_secs)
    }
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self::new(EncodeSettings::default(), 1800)
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn probe_dimensions(&self, video: &Path) -> MediaResult<(u32, u32)> {
        probe_dimensions(video, self.timeout_secs.min(120)).await
    }

    async fn extract_thumbnail(&self, video: &Path, output: &Path) -> MediaResult<PathBuf> {
        extract_thumbnail(video, output, &self.runner()).await
    }

    async fn burn_subtitles(&self, video: &Path, subtitles: &Path, output: &Path) -> MediaResult<PathBuf> {
        burn_subtitles(video, subtitles, output, &self.settings, &self.runner()).await
    }
}
