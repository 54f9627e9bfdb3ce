//! Thumbnail extraction.

use std::path::{Path, PathBuf};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// FFmpeg's `thumbnail` filter picks a representative frame from each batch.
const THUMBNAIL_FILTER: &str = "thumbnail,scale=iw:ih";

pub(crate) fn thumbnail_command(video_path: &Path, output_path: &Path) -> FfmpegCommand {
    FfmpegCommand::new(video_path, output_path)
        .video_filter(THUMBNAIL_FILTER)
        .single_frame()
        .log_level("error")
}

/// Extract one representative frame as an image.
///
/// A zero exit status without an output file is reported as
/// [`MediaError::OutputMissing`], separate from FFmpeg failures.
pub async fn extract_thumbnail(
    video_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    runner: &FfmpegRunner,
) -> MediaResult<PathBuf> {
    let video_path = video_path.as_ref();
    let output_path = output_path.as_ref();

    if !video_path.exists() {
        return Err(MediaError::FileNotFound(video_path.to_path_buf()));
    }

    runner.run(&thumbnail_command(video_path, output_path)).await?;
    ensure_output(output_path).await
}

/// Confirm a tool actually wrote a non-empty file.
pub(crate) async fn ensure_output(path: &Path) -> MediaResult<PathBuf> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() && meta.len() > 0 => Ok(path.to_path_buf()),
        _ => Err(MediaError::OutputMissing(path.to_path_buf())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thumbnail_command() {
        let args = thumbnail_command(Path::new("in.mp4"), Path::new("thumb.jpg")).build_args();
        assert!(args.windows(2).any(|w| w == ["-vf", THUMBNAIL_FILTER]));
        assert!(args.windows(2).any(|w| w == ["-frames:v", "1"]));
        assert_eq!(args.last().unwrap(), "thumb.jpg");
    }

    #[tokio::test]
    async fn test_ensure_output_distinguishes_missing_and_empty() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.jpg");
        assert!(matches!(ensure_output(&missing).await, Err(MediaError::OutputMissing(_))));

        let empty = dir.path().join("empty.jpg");
        std::fs::write(&empty, b"").unwrap();
        assert!(matches!(ensure_output(&empty).await, Err(MediaError::OutputMissing(_))));

        let ok = dir.path().join("ok.jpg");
        std::fs::write(&ok, b"\xFF\xD8").unwrap();
        assert_eq!(ensure_output(&ok).await.unwrap(), ok);
    }

    #[tokio::test]
    async fn test_extract_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let err = extract_thumbnail(dir.path().join("nope.mp4"), dir.path().join("t.jpg"), &FfmpegRunner::new())
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::FileNotFound(_)));
    }
}
