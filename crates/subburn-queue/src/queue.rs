//! Job queue using Redis Streams.

use async_trait::async_trait;
use std::time::Duration;

use redis::AsyncCommands;
use tracing::{debug, info, warn};

use crate::broker::{Delivery, JobBroker};
use crate::error::{QueueError, QueueResult};
use crate::job::CaptionJob;

/// Max delayed jobs moved back onto the stream per consume call.
const PROMOTE_BATCH: usize = 100;

/// Moves due members of the delayed set (KEYS[1]) onto the job stream
/// (KEYS[2]). ZREM and XADD run in one script, so a job is never removed
/// from the set without landing on the stream. The `key` field mirrors
/// [`CaptionJob::idempotency_key`].
const PROMOTE_SCRIPT: &str = r#"
local due = redis.call('ZRANGEBYSCORE', KEYS[1], '-inf', ARGV[1], 'LIMIT', 0, tonumber(ARGV[2]))
local promoted = 0
for _, payload in ipairs(due) do
  if redis.call('ZREM', KEYS[1], payload) == 1 then
    local key = 'undecodable'
    local ok, job = pcall(cjson.decode, payload)
    if ok and type(job) == 'table' and job.job_id then
      key = 'captions:' .. tostring(job.owner_id) .. ':' .. tostring(job.video_id) .. ':' .. tostring(job.job_id)
    end
    redis.call('XADD', KEYS[2], '*', 'job', payload, 'key', key)
    promoted = promoted + 1
  end
end
return promoted
"#;

/// Queue configuration.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Redis URL
    pub redis_url: String,
    /// Stream name for jobs
    pub stream_name: String,
    /// Consumer group name
    pub consumer_group: String,
    /// Dead letter queue stream name
    pub dlq_stream_name: String,
    /// Sorted set holding jobs waiting out their backoff, scored by due time (ms)
    pub delayed_set_name: String,
    /// TTL of enqueue dedup keys
    pub dedup_ttl: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            stream_name: "subburn:jobs".to_string(),
            consumer_group: "subburn:workers".to_string(),
            dlq_stream_name: "subburn:dlq".to_string(),
            delayed_set_name: "subburn:jobs:delayed".to_string(),
            dedup_ttl: Duration::from_secs(3_600),
        }
    }
}

impl QueueConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let stream_name =
            std::env::var("QUEUE_STREAM").unwrap_or_else(|_| defaults.stream_name.clone());
        Self {
            redis_url: std::env::var("REDIS_URL").unwrap_or(defaults.redis_url),
            delayed_set_name: format!("{}:delayed", stream_name),
            stream_name,
            consumer_group: std::env::var("QUEUE_CONSUMER_GROUP").unwrap_or(defaults.consumer_group),
            dlq_stream_name: std::env::var("QUEUE_DLQ_STREAM").unwrap_or(defaults.dlq_stream_name),
            dedup_ttl: std::env::var("QUEUE_DEDUP_TTL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.dedup_ttl),
        }
    }
}

/// Job queue client.
pub struct RedisJobQueue {
    client: redis::Client,
    config: QueueConfig,
    promote_script: redis::Script,
}

impl RedisJobQueue {
    /// Create a new job queue.
    pub fn new(config: QueueConfig) -> QueueResult<Self> {
        let client = redis::Client::open(config.redis_url.as_str())?;
        Ok(Self {
            client,
            config,
            promote_script: redis::Script::new(PROMOTE_SCRIPT),
        })
    }

    /// Create from environment variables.
    pub fn from_env() -> QueueResult<Self> {
        Self::new(QueueConfig::from_env())
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Get queue length.
    pub async fn len(&self) -> QueueResult<u64> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let len: u64 = conn.xlen(&self.config.stream_name).await?;
        Ok(len)
    }

    /// Get DLQ length.
    pub async fn dlq_len(&self) -> QueueResult<u64> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let len: u64 = conn.xlen(&self.config.dlq_stream_name).await?;
        Ok(len)
    }

    /// Number of jobs waiting out a retry delay.
    pub async fn delayed_len(&self) -> QueueResult<u64> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let len: u64 = conn.zcard(&self.config.delayed_set_name).await?;
        Ok(len)
    }

    async fn add_to_stream(
        &self,
        conn: &mut redis::aio::MultiplexedConnection,
        payload: &str,
        key: &str,
    ) -> QueueResult<String> {
        let message_id: String = redis::cmd("XADD")
            .arg(&self.config.stream_name)
            .arg("*")
            .arg("job")
            .arg(payload)
            .arg("key")
            .arg(key)
            .query_async(conn)
            .await?;
        Ok(message_id)
    }

    /// Move delayed jobs whose backoff has expired back onto the stream.
    async fn promote_due(&self) -> QueueResult<usize> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let now_ms = chrono::Utc::now().timestamp_millis();

        let promoted: usize = self
            .promote_script
            .key(&self.config.delayed_set_name)
            .key(&self.config.stream_name)
            .arg(now_ms)
            .arg(PROMOTE_BATCH)
            .invoke_async(&mut conn)
            .await?;
        if promoted > 0 {
            debug!("Promoted {} delayed jobs", promoted);
        }
        Ok(promoted)
    }

    /// Park a payload that cannot be decoded on the DLQ.
    async fn dead_letter_raw(&self, message_id: &str, payload: &str, error: &str) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        redis::cmd("XADD")
            .arg(&self.config.dlq_stream_name)
            .arg("*")
            .arg("job")
            .arg(payload)
            .arg("error")
            .arg(error)
            .arg("original_id")
            .arg(message_id)
            .query_async::<()>(&mut conn)
            .await?;
        self.ack(message_id).await?;
        warn!("Moved undecodable message {} to DLQ: {}", message_id, error);
        Ok(())
    }

    /// Decode stream entries, sending malformed ones straight to the DLQ.
    async fn decode_entries(&self, entries: Vec<redis::streams::StreamId>) -> Vec<Delivery> {
        let mut deliveries = Vec::new();

        for entry in entries {
            let message_id = entry.id.clone();

            let Some(redis::Value::BulkString(payload)) = entry.map.get("job") else {
                warn!("Stream entry {} has no job payload", message_id);
                self.ack(&message_id).await.ok();
                continue;
            };

            let payload_str = String::from_utf8_lossy(payload);
            match CaptionJob::decode(&payload_str) {
                Ok(job) => {
                    debug!("Consumed job {} (attempt {}) from stream", job.job_id, job.attempt);
                    deliveries.push(Delivery { message_id, job });
                }
                Err(e) => {
                    warn!("Failed to parse job payload: {}", e);
                    // Not retryable; park it instead of redelivering forever
                    if let Err(dlq_err) = self.dead_letter_raw(&message_id, &payload_str, &e.to_string()).await {
                        warn!("Failed to dead-letter {}: {}", message_id, dlq_err);
                    }
                }
            }
        }

        deliveries
    }
}

#[async_trait]
impl JobBroker for RedisJobQueue {
    /// Initialize the queue (create consumer group if not exists).
    async fn init(&self) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        // Create consumer group (ignore error if already exists)
        let result: Result<(), redis::RedisError> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg("$")
            .arg("MKSTREAM")
            .query_async(&mut conn)
            .await;

        match result {
            Ok(_) => info!("Created consumer group: {}", self.config.consumer_group),
            Err(e) if e.to_string().contains("BUSYGROUP") => {
                debug!("Consumer group already exists: {}", self.config.consumer_group);
            }
            Err(e) => return Err(QueueError::Redis(e)),
        }

        Ok(())
    }

    async fn enqueue(&self, job: &CaptionJob) -> QueueResult<String> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let payload = job.encode()?;
        let idempotency_key = job.idempotency_key();

        // SET NX claims the dedup key atomically
        let dedup_key = format!("subburn:dedup:{}", idempotency_key);
        let claimed: Option<String> = redis::cmd("SET")
            .arg(&dedup_key)
            .arg("1")
            .arg("NX")
            .arg("EX")
            .arg(self.config.dedup_ttl.as_secs().max(1))
            .query_async(&mut conn)
            .await?;
        if claimed.is_none() {
            warn!("Duplicate job rejected: {}", idempotency_key);
            return Err(QueueError::Duplicate(idempotency_key));
        }

        let message_id = self.add_to_stream(&mut conn, &payload, &idempotency_key).await?;

        info!("Enqueued job {} with message ID {}", job.job_id, message_id);

        Ok(message_id)
    }

    async fn consume(&self, consumer: &str, block_ms: u64, count: usize) -> QueueResult<Vec<Delivery>> {
        if let Err(e) = self.promote_due().await {
            warn!("Failed to promote delayed jobs: {}", e);
        }

        let mut conn = self.client.get_multiplexed_async_connection().await?;

        // Read from consumer group
        let result: redis::streams::StreamReadReply = redis::cmd("XREADGROUP")
            .arg("GROUP")
            .arg(&self.config.consumer_group)
            .arg(consumer)
            .arg("COUNT")
            .arg(count)
            .arg("BLOCK")
            .arg(block_ms)
            .arg("STREAMS")
            .arg(&self.config.stream_name)
            .arg(">") // Only new messages
            .query_async(&mut conn)
            .await?;

        let entries = result.keys.into_iter().flat_map(|key| key.ids).collect();
        Ok(self.decode_entries(entries).await)
    }

    async fn claim_pending(
        &self,
        consumer: &str,
        min_idle_ms: u64,
        count: usize,
    ) -> QueueResult<Vec<Delivery>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        // Pending entries idle for long enough (Redis >= 6.2)
        let pending: redis::streams::StreamPendingCountReply = redis::cmd("XPENDING")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg("IDLE")
            .arg(min_idle_ms)
            .arg("-")
            .arg("+")
            .arg(count)
            .query_async(&mut conn)
            .await?;

        if pending.ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut cmd = redis::cmd("XCLAIM");
        cmd.arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg(consumer)
            .arg(min_idle_ms);
        for entry in &pending.ids {
            cmd.arg(&entry.id);
        }
        let result: redis::streams::StreamClaimReply = cmd.query_async(&mut conn).await?;

        let deliveries = self.decode_entries(result.ids).await;
        for delivery in &deliveries {
            info!("Claimed pending job {} from stream", delivery.job.job_id);
        }
        Ok(deliveries)
    }

    /// Acknowledge a job (mark as completed).
    async fn ack(&self, message_id: &str) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        redis::cmd("XACK")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg(message_id)
            .query_async::<()>(&mut conn)
            .await?;

        // Delete the message from the stream
        redis::cmd("XDEL")
            .arg(&self.config.stream_name)
            .arg(message_id)
            .query_async::<()>(&mut conn)
            .await?;

        debug!("Acknowledged job: {}", message_id);
        Ok(())
    }

    async fn retry_later(&self, message_id: &str, job: &CaptionJob, delay: Duration) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let payload = job.encode()?;
        let due_ms = chrono::Utc::now().timestamp_millis() + delay.as_millis() as i64;

        // Park first, then ack: a crash in between duplicates rather than loses the job
        conn.zadd::<_, _, _, ()>(&self.config.delayed_set_name, &payload, due_ms)
            .await?;
        self.ack(message_id).await?;

        info!(
            "Scheduled job {} attempt {} in {:?}",
            job.job_id, job.attempt, delay
        );
        Ok(())
    }

    /// Move a job to the dead letter queue.
    async fn dead_letter(&self, message_id: &str, job: &CaptionJob, error: &str) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let payload = job.encode()?;

        // Add to DLQ
        redis::cmd("XADD")
            .arg(&self.config.dlq_stream_name)
            .arg("*")
            .arg("job")
            .arg(&payload)
            .arg("error")
            .arg(error)
            .arg("original_id")
            .arg(message_id)
            .query_async::<()>(&mut conn)
            .await?;

        // Ack the original message
        self.ack(message_id).await?;

        warn!("Moved job {} to DLQ: {}", job.job_id, error);
        Ok(())
    }

    async fn ping(&self) -> QueueResult<()> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| QueueError::connection_failed(e.to_string()))?;
        redis::cmd("PING").query_async::<()>(&mut conn).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_names() {
        let config = QueueConfig::default();
        assert_eq!(config.stream_name, "subburn:jobs");
        assert_eq!(config.delayed_set_name, "subburn:jobs:delayed");
        assert_eq!(config.dedup_ttl, Duration::from_secs(3600));
    }

    #[test]
    fn test_new_accepts_url_without_connecting() {
        assert!(RedisJobQueue::new(QueueConfig::default()).is_ok());
    }
}
