//! Caption burn-in worker binary.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use subburn_captions::{FontMetricsMeasurer, HeuristicMeasurer, TextMeasurer};
use subburn_media::{check_ffmpeg, check_ffprobe, FfmpegTranscoder};
use subburn_queue::RedisJobQueue;
use subburn_status::{RedisKv, StatusConfig, VideoStatusStore};
use subburn_storage::object_store_from_env;
use subburn_worker::{PipelineContext, WorkerConfig, WorkerPool};

fn init_tracing() -> anyhow::Result<()> {
    // Colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"))
        .add_directive("subburn=info".parse()?);

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
    Ok(())
}

fn build_measurer(config: &WorkerConfig) -> anyhow::Result<Arc<dyn TextMeasurer>> {
    match &config.font_dir {
        Some(dir) => {
            let measurer = FontMetricsMeasurer::from_dir(dir)
                .with_context(|| format!("loading fonts from {}", dir.display()))?;
            info!("Loaded metrics for {} font families", measurer.loaded_families());
            Ok(Arc::new(measurer))
        }
        None => {
            info!("FONT_DIR not set, using heuristic text measurement");
            Ok(Arc::new(HeuristicMeasurer))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider (required for TLS to Redis and R2)
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    // Load environment variables
    dotenvy::dotenv().ok();

    init_tracing()?;

    info!("Starting subburn-worker");

    let config = WorkerConfig::from_env().context("invalid worker configuration")?;
    info!("Worker config: {:?}", config);

    check_ffmpeg().context("ffmpeg not found on PATH")?;
    check_ffprobe().context("ffprobe not found on PATH")?;
    tokio::fs::create_dir_all(&config.work_dir)
        .await
        .with_context(|| format!("creating work dir {}", config.work_dir.display()))?;

    let measurer = build_measurer(&config)?;
    let storage = object_store_from_env().await.context("configuring object storage")?;
    let kv = RedisKv::from_env().context("configuring status store")?;
    let status_config = StatusConfig::from_env();
    config
        .validate_status_ttl(&status_config)
        .context("invalid status store configuration")?;
    let status = VideoStatusStore::new(Arc::new(kv), status_config);
    let queue = RedisJobQueue::from_env().context("configuring job queue")?;
    let transcoder = FfmpegTranscoder::new(config.encode.clone(), config.ffmpeg_timeout_secs);

    let ctx = PipelineContext {
        config,
        transcoder: Arc::new(transcoder),
        storage,
        status,
        measurer,
    };
    let pool = Arc::new(WorkerPool::new(ctx, Arc::new(queue)));

    // Setup signal handler
    let signal_pool = Arc::clone(&pool);
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Received shutdown signal");
        signal_pool.shutdown();
    });

    pool.run().await?;

    info!("Worker shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.ok();
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
