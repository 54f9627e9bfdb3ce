//! Subtitle burn-in.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::thumbnail::ensure_output;

/// Video encoder settings for the burned output. Audio is always copied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodeSettings {
    pub video_codec: String,
    pub preset: String,
    pub crf: u8,
    /// 0 lets FFmpeg pick
    pub threads: u32,
}

impl Default for EncodeSettings {
    fn default() -> Self {
        Self {
            video_codec: "libx264".to_string(),
            preset: "fast".to_string(),
            crf: 18,
            threads: 0,
        }
    }
}

/// Characters with meaning inside a filter option value.
const OPTION_SPECIAL: &[char] = &['\\', '\'', ':'];

/// Characters with meaning in the filter graph description.
const GRAPH_SPECIAL: &[char] = &['\\', '\'', '[', ']', ',', ';'];

fn backslash_escape(value: &str, special: &[char]) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if special.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Escape a path for use as an unquoted filter option inside `-vf`.
///
/// FFmpeg unescapes the value twice: once when splitting the graph into
/// filters and once when parsing the filter's options. Arguments never pass
/// through a shell, so no third level is applied. Backslash separators are
/// normalized to `/` first so Windows paths survive.
pub fn escape_filter_path(path: &Path) -> String {
    let normalized = path.to_string_lossy().replace('\\', "/");
    backslash_escape(&backslash_escape(&normalized, OPTION_SPECIAL), GRAPH_SPECIAL)
}

pub(crate) fn burn_command(
    video_path: &Path,
    subtitle_path: &Path,
    output_path: &Path,
    settings: &EncodeSettings,
) -> FfmpegCommand {
    FfmpegCommand::new(video_path, output_path)
        .video_filter(format!("ass={}", escape_filter_path(subtitle_path)))
        .video_codec(settings.video_codec.as_str())
        .preset(settings.preset.as_str())
        .crf(settings.crf)
        .threads(settings.threads)
        .audio_codec("copy")
        .log_level("error")
}

/// Re-encode `video_path` with the subtitle document rendered into the frames.
pub async fn burn_subtitles(
    video_path: impl AsRef<Path>,
    subtitle_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    settings: &EncodeSettings,
    runner: &FfmpegRunner,
) -> MediaResult<PathBuf> {
    let video_path = video_path.as_ref();
    let subtitle_path = subtitle_path.as_ref();
    let output_path = output_path.as_ref();

    for input in [video_path, subtitle_path] {
        if !input.exists() {
            return Err(MediaError::FileNotFound(input.to_path_buf()));
        }
    }

    let cmd = burn_command(video_path, subtitle_path, output_path, settings);
    runner
        .run_with_progress(&cmd, |p| {
            debug!(frame = p.frame, out_time_ms = p.out_time_ms, speed = p.speed, "Burn progress");
        })
        .await?;

    ensure_output(output_path).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_filter_path() {
        assert_eq!(escape_filter_path(Path::new("/work/job-1/subs.ass")), "/work/job-1/subs.ass");
        assert_eq!(escape_filter_path(Path::new(r"C:\work\subs.ass")), r"C\\:/work/subs.ass");
    }

    #[test]
    fn test_escape_filter_path_applies_both_levels() {
        // Option level turns ' into \', the graph level then escapes both chars
        assert_eq!(escape_filter_path(Path::new("/tmp/it's.ass")), r"/tmp/it\\\'s.ass");
        assert_eq!(
            escape_filter_path(Path::new("/tmp/a,b[1];c.ass")),
            r"/tmp/a\,b\[1\]\;c.ass"
        );
        assert_eq!(escape_filter_path(Path::new("/tmp/x:y.ass")), r"/tmp/x\\:y.ass");
    }

    #[test]
    fn test_burn_command_args() {
        let args = burn_command(
            Path::new("/w/in.mp4"),
            Path::new("/w/subs.ass"),
            Path::new("/w/out.mp4"),
            &EncodeSettings::default(),
        )
        .build_args();

        assert!(args.windows(2).any(|w| w == ["-vf", "ass=/w/subs.ass"]));
        assert!(args.windows(2).any(|w| w == ["-c:v", "libx264"]));
        assert!(args.windows(2).any(|w| w == ["-preset", "fast"]));
        assert!(args.windows(2).any(|w| w == ["-crf", "18"]));
        assert!(args.windows(2).any(|w| w == ["-threads", "0"]));
        assert!(args.windows(2).any(|w| w == ["-c:a", "copy"]));
        assert_eq!(args.last().unwrap(), "/w/out.mp4");
    }

    #[tokio::test]
    async fn test_burn_requires_subtitle_file() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("in.mp4");
        std::fs::write(&video, b"x").unwrap();
        let err = burn_subtitles(
            &video,
            dir.path().join("missing.ass"),
            dir.path().join("out.mp4"),
            &EncodeSettings::default(),
            &FfmpegRunner::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, MediaError::FileNotFound(_)));
    }
}
