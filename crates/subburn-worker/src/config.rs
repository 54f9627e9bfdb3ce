//! Worker configuration.

use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

use subburn_captions::{LayoutConfig, SegmenterConfig};
use subburn_media::EncodeSettings;
use subburn_status::StatusConfig;

use crate::error::{WorkerError, WorkerResult};

/// Minimum gap between the attempt deadline and the claim idle threshold.
pub const CLAIM_IDLE_MARGIN: Duration = Duration::from_secs(60);

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Maximum concurrent jobs
    pub max_concurrent_jobs: usize,
    /// Work directory for per-job temporary files
    pub work_dir: PathBuf,
    /// Deadline for one pipeline attempt
    pub attempt_timeout: Duration,
    /// How long shutdown waits for in-flight jobs
    pub shutdown_timeout: Duration,
    /// How long one consume call blocks waiting for messages
    pub block_ms: u64,
    /// How often the worker should scan for orphaned pending jobs
    pub claim_interval: Duration,
    /// Minimum idle time before a pending job can be claimed (crash recovery)
    pub claim_min_idle: Duration,
    /// Per-invocation FFmpeg/FFprobe timeout
    pub ffmpeg_timeout_secs: u64,
    pub segmenter: SegmenterConfig,
    pub layout: LayoutConfig,
    /// Directory of .ttf/.otf files used for text measurement
    pub font_dir: Option<PathBuf>,
    pub encode: EncodeSettings,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 2,
            work_dir: PathBuf::from("/tmp/subburn/work"),
            attempt_timeout: Duration::from_secs(1800), // 30 minutes
            shutdown_timeout: Duration::from_secs(60),
            block_ms: 1000,
            claim_interval: Duration::from_secs(30),
            claim_min_idle: Duration::from_secs(2400), // longer than one attempt
            ffmpeg_timeout_secs: 1800,
            segmenter: SegmenterConfig::default(),
            layout: LayoutConfig::default(),
            font_dir: None,
            encode: EncodeSettings::default(),
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}

impl WorkerConfig {
    /// Create config from environment variables.
    ///
    /// Fails when the resulting timeouts would let a running job be claimed.
    pub fn from_env() -> WorkerResult<Self> {
        let defaults = Self::default();

        let segmenter = match std::env::var("SEGMENTER_PRESET") {
            Ok(name) => SegmenterConfig::preset(&name).unwrap_or_else(|| {
                warn!("Unknown SEGMENTER_PRESET '{}', using default", name);
                defaults.segmenter.clone()
            }),
            Err(_) => defaults.segmenter.clone(),
        };

        let layout = LayoutConfig {
            max_lines: env_parse::<usize>("CAPTION_MAX_LINES")
                .filter(|n| *n >= 1)
                .unwrap_or(defaults.layout.max_lines),
            max_width_ratio: env_parse::<f64>("CAPTION_MAX_WIDTH_RATIO")
                .filter(|r| *r > 0.0 && *r <= 1.0)
                .unwrap_or(defaults.layout.max_width_ratio),
        };

        let encode = EncodeSettings {
            video_codec: std::env::var("ENCODE_VIDEO_CODEC").unwrap_or(defaults.encode.video_codec.clone()),
            preset: std::env::var("ENCODE_PRESET").unwrap_or(defaults.encode.preset.clone()),
            crf: env_parse("ENCODE_CRF").unwrap_or(defaults.encode.crf),
            threads: env_parse("ENCODE_THREADS").unwrap_or(defaults.encode.threads),
        };

        let config = Self {
            max_concurrent_jobs: env_parse::<usize>("WORKER_MAX_CONCURRENT_JOBS")
                .filter(|n| *n >= 1)
                .unwrap_or(defaults.max_concurrent_jobs),
            work_dir: std::env::var("WORKER_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            attempt_timeout: env_parse("WORKER_ATTEMPT_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.attempt_timeout),
            shutdown_timeout: env_parse("WORKER_SHUTDOWN_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.shutdown_timeout),
            block_ms: env_parse("QUEUE_BLOCK_MS").unwrap_or(defaults.block_ms),
            claim_interval: env_parse::<u64>("WORKER_CLAIM_INTERVAL_SECS")
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.claim_interval),
            claim_min_idle: env_parse("QUEUE_CLAIM_IDLE_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.claim_min_idle),
            ffmpeg_timeout_secs: env_parse("FFMPEG_TIMEOUT_SECS").unwrap_or(defaults.ffmpeg_timeout_secs),
            segmenter,
            layout,
            font_dir: std::env::var("FONT_DIR").ok().filter(|s| !s.is_empty()).map(PathBuf::from),
            encode,
        };
        config.validate()?;
        Ok(config)
    }

    /// A pending delivery must stay unclaimable for longer than one attempt
    /// can run, otherwise a second worker would start on the same job and
    /// share its work directory.
    pub fn validate(&self) -> WorkerResult<()> {
        let required = self.attempt_timeout + CLAIM_IDLE_MARGIN;
        if self.claim_min_idle < required {
            return Err(WorkerError::config_error(format!(
                "claim idle threshold {}ms must be at least attempt timeout + {}s ({}ms)",
                self.claim_min_idle.as_millis(),
                CLAIM_IDLE_MARGIN.as_secs(),
                required.as_millis()
            )));
        }
        Ok(())
    }

    /// The processing record is re-armed at each attempt start, so its TTL
    /// only has to outlive a single attempt.
    pub fn validate_status_ttl(&self, status: &StatusConfig) -> WorkerResult<()> {
        if status.status_ttl <= self.attempt_timeout {
            return Err(WorkerError::config_error(format!(
                "status TTL {}s must exceed the attempt timeout {}s",
                status.status_ttl.as_secs(),
                self.attempt_timeout.as_secs()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "WORKER_MAX_CONCURRENT_JOBS",
        "WORKER_ATTEMPT_TIMEOUT_SECS",
        "SEGMENTER_PRESET",
        "CAPTION_MAX_LINES",
        "CAPTION_MAX_WIDTH_RATIO",
        "FONT_DIR",
        "ENCODE_CRF",
        "QUEUE_CLAIM_IDLE_MS",
    ];

    fn clear() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear();
        let config = WorkerConfig::from_env().unwrap();
        assert_eq!(config.max_concurrent_jobs, 2);
        assert_eq!(config.attempt_timeout, Duration::from_secs(1800));
        assert_eq!(config.layout, LayoutConfig::default());
        assert_eq!(config.segmenter, SegmenterConfig::word_capped());
        assert_eq!(config.font_dir, None);
    }

    #[test]
    #[serial]
    fn test_overrides() {
        clear();
        std::env::set_var("WORKER_MAX_CONCURRENT_JOBS", "4");
        std::env::set_var("SEGMENTER_PRESET", "duration_only");
        std::env::set_var("CAPTION_MAX_LINES", "2");
        std::env::set_var("CAPTION_MAX_WIDTH_RATIO", "0.6");
        std::env::set_var("FONT_DIR", "/usr/share/fonts");
        std::env::set_var("ENCODE_CRF", "23");

        let config = WorkerConfig::from_env().unwrap();
        assert_eq!(config.max_concurrent_jobs, 4);
        assert_eq!(config.segmenter, SegmenterConfig::duration_only());
        assert_eq!(config.layout.max_lines, 2);
        assert_eq!(config.layout.max_width_ratio, 0.6);
        assert_eq!(config.font_dir, Some(PathBuf::from("/usr/share/fonts")));
        assert_eq!(config.encode.crf, 23);
        clear();
    }

    #[test]
    #[serial]
    fn test_invalid_values_fall_back() {
        clear();
        std::env::set_var("WORKER_MAX_CONCURRENT_JOBS", "0");
        std::env::set_var("SEGMENTER_PRESET", "nonsense");
        std::env::set_var("CAPTION_MAX_WIDTH_RATIO", "3.5");

        let config = WorkerConfig::from_env().unwrap();
        assert_eq!(config.max_concurrent_jobs, 2);
        assert_eq!(config.segmenter, SegmenterConfig::default());
        assert_eq!(config.layout.max_width_ratio, 0.8);
        clear();
    }

    #[test]
    #[serial]
    fn test_claim_idle_shorter_than_attempt_is_rejected() {
        clear();
        std::env::set_var("WORKER_ATTEMPT_TIMEOUT_SECS", "600");
        std::env::set_var("QUEUE_CLAIM_IDLE_MS", "300000");

        let err = WorkerConfig::from_env().unwrap_err();
        assert!(matches!(err, WorkerError::ConfigError(_)));
        assert!(err.to_string().contains("claim idle threshold"));

        // Within the margin is still too tight
        std::env::set_var("QUEUE_CLAIM_IDLE_MS", "630000");
        assert!(WorkerConfig::from_env().is_err());

        std::env::set_var("QUEUE_CLAIM_IDLE_MS", "660000");
        let config = WorkerConfig::from_env().unwrap();
        assert_eq!(config.claim_min_idle, Duration::from_secs(660));
        clear();
    }

    #[test]
    fn test_default_timeouts_are_consistent() {
        let config = WorkerConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.validate_status_ttl(&StatusConfig::default()).is_ok());
    }

    #[test]
    fn test_status_ttl_must_outlive_one_attempt() {
        let config = WorkerConfig::default();
        let status = StatusConfig {
            status_ttl: Duration::from_secs(1800),
            ..StatusConfig::default()
        };
        assert!(config.validate_status_ttl(&status).is_err());
    }
}
