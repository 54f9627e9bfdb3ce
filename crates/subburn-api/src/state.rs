//! Application state.

use std::sync::Arc;

use tracing::info;

use subburn_queue::{JobBroker, RedisJobQueue, RetryPolicy};
use subburn_status::{RedisKv, StatusConfig, VideoStatusStore};
use subburn_storage::{object_store_from_env, ObjectStore};

use crate::background::BackgroundTasks;
use crate::config::ApiConfig;
use crate::error::ApiResult;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub status: VideoStatusStore,
    pub broker: Arc<dyn JobBroker>,
    pub storage: Arc<dyn ObjectStore>,
    pub tasks: BackgroundTasks,
    /// Retry policy stamped onto every new job
    pub retry: RetryPolicy,
}

impl AppState {
    /// Create new application state with Redis and object storage from the environment.
    pub async fn new(config: ApiConfig) -> ApiResult<Self> {
        let kv = RedisKv::from_env()?;
        let status = VideoStatusStore::new(Arc::new(kv), StatusConfig::from_env());

        let queue = RedisJobQueue::from_env()?;
        queue.init().await?;
        info!("Job queue ready on stream {}", queue.config().stream_name);

        let storage = object_store_from_env().await?;

        Ok(Self::with_parts(config, status, Arc::new(queue), storage))
    }

    /// Assemble state from already-built backends.
    pub fn with_parts(
        config: ApiConfig,
        status: VideoStatusStore,
        broker: Arc<dyn JobBroker>,
        storage: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            config,
            status,
            broker,
            storage,
            tasks: BackgroundTasks::new(),
            retry: RetryPolicy::from_env(),
        }
    }
}
