//! FFmpeg CLI wrapper for the caption burn-in pipeline.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building (argument arrays, never a shell)
//! - Progress parsing from `-progress pipe:2`
//! - Per-invocation timeouts that kill the child process
//! - Dimension probing, thumbnail extraction and subtitle burn-in
//! - The [`Transcoder`] trait the worker pipeline is written against

pub mod burn;
pub mod command;
pub mod error;
pub mod probe;
pub mod progress;
pub mod thumbnail;
pub mod transcoder;

pub use burn::{burn_subtitles, escape_filter_path, EncodeSettings};
pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use probe::{parse_dimensions, probe_dimensions};
pub use progress::FfmpegProgress;
pub use thumbnail::extract_thumbnail;
pub use transcoder::{FfmpegTranscoder, Transcoder};
