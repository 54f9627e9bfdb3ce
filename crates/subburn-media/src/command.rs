//! `ffmpeg` invocations for thumbnails and caption burn-in.
//!
//! A command is an argument vector handed straight to the child process,
//! never a shell string, so paths with spaces or quotes need no quoting here.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{ChildStderr, Command};
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};
use crate::progress::FfmpegProgress;

/// Diagnostic lines kept for the error of a failed run.
const DIAGNOSTIC_TAIL_LINES: usize = 20;

/// One `ffmpeg` run reading one video and writing one file.
///
/// Always overwrites the output and reports progress on stderr.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    input: PathBuf,
    output: PathBuf,
    filter: Option<String>,
    /// `(flag, value)` pairs placed between the filter and the output path
    options: Vec<(String, String)>,
    log_level: String,
}

impl FfmpegCommand {
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            filter: None,
            options: Vec::new(),
            log_level: "error".to_string(),
        }
    }

    fn option(mut self, flag: &str, value: impl Into<String>) -> Self {
        self.options.push((flag.to_string(), value.into()));
        self
    }

    /// Filter graph for the video stream. A second call replaces the first.
    pub fn video_filter(mut self, graph: impl Into<String>) -> Self {
        self.filter = Some(graph.into());
        self
    }

    pub fn video_codec(self, codec: impl Into<String>) -> Self {
        self.option("-c:v", codec)
    }

    /// `copy` passes the source audio through untouched.
    pub fn audio_codec(self, codec: impl Into<String>) -> Self {
        self.option("-c:a", codec)
    }

    pub fn crf(self, crf: u8) -> Self {
        self.option("-crf", crf.to_string())
    }

    pub fn preset(self, preset: impl Into<String>) -> Self {
        self.option("-preset", preset)
    }

    /// 0 leaves the thread count to the encoder.
    pub fn threads(self, threads: u32) -> Self {
        self.option("-threads", threads.to_string())
    }

    /// Stop after the first video frame, for still images.
    pub fn single_frame(self) -> Self {
        self.option("-frames:v", "1")
    }

    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    pub fn build_args(&self) -> Vec<String> {
        let mut args = vec![
            "-y".to_string(),
            "-v".to_string(),
            self.log_level.clone(),
            "-progress".to_string(),
            "pipe:2".to_string(),
            "-i".to_string(),
            self.input.to_string_lossy().into_owned(),
        ];
        if let Some(graph) = &self.filter {
            args.push("-vf".to_string());
            args.push(graph.clone());
        }
        for (flag, value) in &self.options {
            args.push(flag.clone());
            args.push(value.clone());
        }
        args.push(self.output.to_string_lossy().into_owned());
        args
    }
}

/// Last few non-progress stderr lines of a run.
#[derive(Debug, Default)]
struct DiagnosticTail(VecDeque<String>);

impl DiagnosticTail {
    fn push(&mut self, line: String) {
        if line.trim().is_empty() {
            return;
        }
        if self.0.len() == DIAGNOSTIC_TAIL_LINES {
            self.0.pop_front();
        }
        self.0.push_back(line);
    }

    fn into_text(self) -> Option<String> {
        (!self.0.is_empty()).then(|| Vec::from(self.0).join("\n"))
    }
}

/// Reads stderr to the end, routing progress blocks to `on_progress`.
async fn drain_stderr<F>(stderr: ChildStderr, on_progress: F) -> DiagnosticTail
where
    F: Fn(FfmpegProgress),
{
    let mut lines = BufReader::new(stderr).lines();
    let mut progress = FfmpegProgress::default();
    let mut tail = DiagnosticTail::default();

    while let Ok(Some(line)) = lines.next_line().await {
        if !FfmpegProgress::is_progress_line(&line) {
            tail.push(line);
        } else if let Some(update) = progress.apply_line(&line) {
            on_progress(update);
        }
    }
    tail
}

/// Spawns `ffmpeg` with an optional wall-clock limit.
///
/// The child is killed when the limit passes and also when the returned
/// future is dropped, so an attempt deadline above this one stops FFmpeg too.
#[derive(Debug, Clone, Default)]
pub struct FfmpegRunner {
    timeout: Option<Duration>,
}

impl FfmpegRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Some(Duration::from_secs(secs));
        self
    }

    pub async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
        self.run_with_progress(cmd, |_| {}).await
    }

    pub async fn run_with_progress<F>(&self, cmd: &FfmpegCommand, on_progress: F) -> MediaResult<()>
    where
        F: Fn(FfmpegProgress) + Send + 'static,
    {
        check_ffmpeg()?;

        let args = cmd.build_args();
        debug!("ffmpeg {}", args.join(" "));

        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| MediaError::ffmpeg_failed("stderr of ffmpeg was not piped", None, None))?;
        let drain = tokio::spawn(drain_stderr(stderr, on_progress));

        let waited = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
                Ok(status) => status,
                Err(_) => {
                    warn!("ffmpeg still running after {}s, killing it", limit.as_secs());
                    let _ = child.kill().await;
                    drain.abort();
                    return Err(MediaError::Timeout(limit.as_secs()));
                }
            },
            None => child.wait().await,
        };
        let status: ExitStatus = waited?;
        let diagnostics = drain.await.ok().and_then(DiagnosticTail::into_text);

        if status.success() {
            Ok(())
        } else {
            Err(MediaError::ffmpeg_failed(
                format!("ffmpeg exited with {}", status),
                diagnostics,
                status.code(),
            ))
        }
    }
}

/// Locate `ffmpeg` on PATH.
pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)
}

/// Locate `ffprobe` on PATH.
pub fn check_ffprobe() -> MediaResult<PathBuf> {
    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)
}
