//! Per-job working directories.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use subburn_models::JobId;

use crate::error::WorkerResult;

/// Scratch directory `{work_dir}/{job_id}` holding one attempt's files.
#[derive(Debug, Clone)]
pub struct JobWorkspace {
    dir: PathBuf,
}

impl JobWorkspace {
    /// Create (or reuse) the directory for `job_id`.
    pub async fn create(work_dir: &Path, job_id: &JobId) -> WorkerResult<Self> {
        let dir = work_dir.join(job_id.as_str());
        tokio::fs::create_dir_all(&dir).await?;
        debug!("Created work dir {}", dir.display());
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn source(&self) -> PathBuf {
        self.dir.join("source.mp4")
    }

    pub fn thumbnail(&self) -> PathBuf {
        self.dir.join("thumbnail.jpg")
    }

    pub fn subtitles(&self) -> PathBuf {
        self.dir.join("captions.ass")
    }

    pub fn output(&self) -> PathBuf {
        self.dir.join("captioned.mp4")
    }

    /// Remove the directory. Failures are logged and otherwise ignored.
    pub async fn cleanup(&self) {
        match tokio::fs::remove_dir_all(&self.dir).await {
            Ok(()) => debug!("Removed work dir {}", self.dir.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove work dir {}: {}", self.dir.display(), e),
        }
    }
}
