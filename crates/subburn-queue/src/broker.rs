//! Broker port used by the worker and the API.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::QueueResult;
use crate::job::CaptionJob;

/// One received message.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub message_id: String,
    pub job: CaptionJob,
}

#[async_trait]
pub trait JobBroker: Send + Sync {
    /// Create streams and consumer groups if missing.
    async fn init(&self) -> QueueResult<()>;

    /// Add a new job; returns the message id.
    async fn enqueue(&self, job: &CaptionJob) -> QueueResult<String>;

    /// Receive up to `count` new deliveries, waiting at most `block_ms`.
    async fn consume(&self, consumer: &str, block_ms: u64, count: usize) -> QueueResult<Vec<Delivery>>;

    /// Take over deliveries left unacknowledged for at least `min_idle_ms`.
    async fn claim_pending(&self, consumer: &str, min_idle_ms: u64, count: usize)
        -> QueueResult<Vec<Delivery>>;

    /// Acknowledge and remove a delivery.
    async fn ack(&self, message_id: &str) -> QueueResult<()>;

    /// Schedule `job` as a new delivery after `delay`, then acknowledge `message_id`.
    async fn retry_later(&self, message_id: &str, job: &CaptionJob, delay: Duration) -> QueueResult<()>;

    /// Move `job` to the dead-letter stream and acknowledge `message_id`.
    async fn dead_letter(&self, message_id: &str, job: &CaptionJob, error: &str) -> QueueResult<()>;

    async fn ping(&self) -> QueueResult<()>;
}
