//! Key-value port.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::StatusResult;

/// Minimal key-value store with per-key expiry.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> StatusResult<Option<String>>;

    /// Set `key`, replacing any previous value and expiry.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> StatusResult<()>;

    async fn delete(&self, key: &str) -> StatusResult<()>;

    /// Keys matching a glob pattern (`*` wildcards).
    async fn scan(&self, pattern: &str) -> StatusResult<Vec<String>>;

    async fn ping(&self) -> StatusResult<()>;
}
