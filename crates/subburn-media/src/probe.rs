//! FFprobe video dimensions.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use crate::command::check_ffprobe;
use crate::error::{MediaError, MediaResult};

/// Probe the first video stream for its `(width, height)`.
pub async fn probe_dimensions(path: impl AsRef<Path>, timeout_secs: u64) -> MediaResult<(u32, u32)> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    check_ffprobe()?;

    let child = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height",
            "-of",
            "csv=s=x:p=0",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output();

    let output = tokio::time::timeout(Duration::from_secs(timeout_secs), child)
        .await
        .map_err(|_| MediaError::Timeout(timeout_secs))??;

    if !output.status.success() {
        return Err(MediaError::ffprobe_failed(
            "FFprobe exited with non-zero status",
            Some(String::from_utf8_lossy(&output.stderr).trim().to_string()),
        ));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let dimensions = parse_dimensions(&stdout)?;
    debug!(path = %path.display(), width = dimensions.0, height = dimensions.1, "Probed video");
    Ok(dimensions)
}

/// Parse the first non-empty `WxH` line of FFprobe CSV output.
pub fn parse_dimensions(output: &str) -> MediaResult<(u32, u32)> {
    let line = output
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .ok_or_else(|| MediaError::invalid_video("FFprobe reported no video stream"))?;

    let (w, h) = line
        .trim_end_matches('x')
        .split_once('x')
        .ok_or_else(|| MediaError::invalid_video(format!("Unexpected FFprobe output: {line}")))?;

    let parse = |s: &str| s.trim().parse::<u32>().ok().filter(|v| *v > 0);
    match (parse(w), parse(h)) {
        (Some(width), Some(height)) => Ok((width, height)),
        _ => Err(MediaError::invalid_video(format!("Invalid dimensions: {line}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dimensions() {
        assert_eq!(parse_dimensions("1920x1080\n").unwrap(), (1920, 1080));
        assert_eq!(parse_dimensions("\n  720x1280  \n").unwrap(), (720, 1280));
        // Some builds print a trailing separator.
        assert_eq!(parse_dimensions("640x360x\n").unwrap(), (640, 360));
    }

    #[test]
    fn test_parse_dimensions_rejects_garbage() {
        assert!(matches!(parse_dimensions(""), Err(MediaError::InvalidVideo(_))));
        assert!(matches!(parse_dimensions("N/A"), Err(MediaError::InvalidVideo(_))));
        assert!(matches!(parse_dimensions("0x1080"), Err(MediaError::InvalidVideo(_))));
        assert!(matches!(parse_dimensions("axb"), Err(MediaError::InvalidVideo(_))));
    }

    #[tokio::test]
    async fn test_probe_missing_file() {
        let err = probe_dimensions("/nonexistent/video.mp4", 5).await.unwrap_err();
        assert!(matches!(err, MediaError::FileNotFound(_)));
    }
}
