//! In-process broker for single-node runs and tests.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;

use crate::broker::{Delivery, JobBroker};
use crate::error::{QueueError, QueueResult};
use crate::job::CaptionJob;

#[derive(Default)]
struct State {
    next_id: u64,
    ready: VecDeque<(String, CaptionJob)>,
    pending: BTreeMap<String, CaptionJob>,
    delayed: Vec<(Instant, CaptionJob)>,
    dead: Vec<(CaptionJob, String)>,
    seen: HashSet<String>,
}

impl State {
    fn push_ready(&mut self, job: CaptionJob) -> String {
        self.next_id += 1;
        let id = format!("{}-0", self.next_id);
        self.ready.push_back((id.clone(), job));
        id
    }

    fn promote_due(&mut self, now: Instant) {
        let (due, waiting): (Vec<_>, Vec<_>) = self.delayed.drain(..).partition(|(at, _)| *at <= now);
        self.delayed = waiting;
        for (_, job) in due {
            self.push_ready(job);
        }
    }
}

/// Queue held in process memory. Same semantics as the Redis broker minus
/// durability and cross-process claiming.
#[derive(Default)]
pub struct InMemoryBroker {
    state: Mutex<State>,
    notify: Notify,
    unavailable: AtomicBool,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail with a connection error (for tests).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Jobs moved to the dead-letter list, with their error.
    pub fn dead_letters(&self) -> Vec<(CaptionJob, String)> {
        self.lock().map(|s| s.dead.clone()).unwrap_or_default()
    }

    pub fn ready_len(&self) -> usize {
        self.lock().map(|s| s.ready.len()).unwrap_or_default()
    }

    pub fn pending_len(&self) -> usize {
        self.lock().map(|s| s.pending.len()).unwrap_or_default()
    }

    pub fn delayed_len(&self) -> usize {
        self.lock().map(|s| s.delayed.len()).unwrap_or_default()
    }

    /// No job waiting, in flight, or delayed.
    pub fn is_drained(&self) -> bool {
        self.lock()
            .map(|s| s.ready.is_empty() && s.pending.is_empty() && s.delayed.is_empty())
            .unwrap_or(false)
    }

    fn lock(&self) -> QueueResult<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| QueueError::connection_failed("in-memory broker lock poisoned"))
    }

    fn check_available(&self) -> QueueResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(QueueError::connection_failed("broker unavailable"));
        }
        Ok(())
    }

    fn take_ready(&self, count: usize) -> QueueResult<(Vec<Delivery>, Option<Instant>)> {
        let mut state = self.lock()?;
        state.promote_due(Instant::now());

        let mut out = Vec::new();
        while out.len() < count.max(1) {
            let Some((message_id, job)) = state.ready.pop_front() else {
                break;
            };
            state.pending.insert(message_id.clone(), job.clone());
            out.push(Delivery { message_id, job });
        }
        let next_due = state.delayed.iter().map(|(at, _)| *at).min();
        Ok((out, next_due))
    }
}

#[async_trait]
impl JobBroker for InMemoryBroker {
    async fn init(&self) -> QueueResult<()> {
        self.check_available()
    }

    async fn enqueue(&self, job: &CaptionJob) -> QueueResult<String> {
        self.check_available()?;
        let id = {
            let mut state = self.lock()?;
            let key = job.idempotency_key();
            if !state.seen.insert(key.clone()) {
                return Err(QueueError::Duplicate(key));
            }
            state.push_ready(job.clone())
        };
        self.notify.notify_one();
        Ok(id)
    }

    async fn consume(&self, _consumer: &str, block_ms: u64, count: usize) -> QueueResult<Vec<Delivery>> {
        self.check_available()?;

        let deadline = Instant::now() + Duration::from_millis(block_ms);
        loop {
            let (deliveries, next_due) = self.take_ready(count)?;
            if !deliveries.is_empty() {
                return Ok(deliveries);
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(Vec::new());
            }
            let wake = next_due.map_or(deadline, |due| due.min(deadline));
            let _ = tokio::time::timeout_at(wake, self.notify.notified()).await;
        }
    }

    async fn claim_pending(&self, _consumer: &str, _min_idle_ms: u64, _count: usize) -> QueueResult<Vec<Delivery>> {
        self.check_available()?;
        Ok(Vec::new())
    }

    async fn ack(&self, message_id: &str) -> QueueResult<()> {
        self.check_available()?;
        self.lock()?.pending.remove(message_id);
        Ok(())
    }

    async fn retry_later(&self, message_id: &str, job: &CaptionJob, delay: Duration) -> QueueResult<()> {
        self.check_available()?;
        {
            let mut state = self.lock()?;
            state.delayed.push((Instant::now() + delay, job.clone()));
            state.pending.remove(message_id);
        }
        self.notify.notify_one();
        Ok(())
    }

    async fn dead_letter(&self, message_id: &str, job: &CaptionJob, error: &str) -> QueueResult<()> {
        self.check_available()?;
        let mut state = self.lock()?;
        state.dead.push((job.clone(), error.to_string()));
        state.pending.remove(message_id);
        Ok(())
    }

    async fn ping(&self) -> QueueResult<()> {
        self.check_available()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::VideoSource;
    use subburn_models::{OwnerId, SubtitleStyle, TranscriptionSegment, VideoId};

    fn job() -> CaptionJob {
        CaptionJob::new(
            OwnerId::from("owner1"),
            VideoId::from("video1"),
            VideoSource::Local { path: "/tmp/in.mp4".into() },
            "file:///tmp/in.mp4",
            vec![TranscriptionSegment::new(0, 0.0, 1.0, "hi")],
            SubtitleStyle::default(),
        )
    }

    #[tokio::test]
    async fn test_enqueue_consume_ack() {
        let broker = InMemoryBroker::new();
        let job = job();
        broker.enqueue(&job).await.unwrap();

        let deliveries = broker.consume("w1", 10, 5).await.unwrap();
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].job.job_id, job.job_id);
        assert_eq!(broker.pending_len(), 1);

        broker.ack(&deliveries[0].message_id).await.unwrap();
        assert!(broker.is_drained());
    }

    #[tokio::test]
    async fn test_duplicate_enqueue_rejected() {
        let broker = InMemoryBroker::new();
        let job = job();
        broker.enqueue(&job).await.unwrap();
        assert!(matches!(broker.enqueue(&job).await, Err(QueueError::Duplicate(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_is_redelivered_after_delay() {
        let broker = InMemoryBroker::new();
        broker.enqueue(&job()).await.unwrap();
        let first = broker.consume("w1", 10, 1).await.unwrap().remove(0);

        let next = first.job.next_attempt();
        broker
            .retry_later(&first.message_id, &next, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(broker.delayed_len(), 1);
        assert_eq!(broker.pending_len(), 0);

        assert!(broker.consume("w1", 1_000, 1).await.unwrap().is_empty());

        let redelivered = broker.consume("w1", 10_000, 1).await.unwrap();
        assert_eq!(redelivered.len(), 1);
        assert_eq!(redelivered[0].job.attempt, 2);
        assert_ne!(redelivered[0].message_id, first.message_id);
    }

    #[tokio::test]
    async fn test_dead_letter_records_error() {
        let broker = InMemoryBroker::new();
        broker.enqueue(&job()).await.unwrap();
        let delivery = broker.consume("w1", 10, 1).await.unwrap().remove(0);
        broker
            .dead_letter(&delivery.message_id, &delivery.job, "encode failed")
            .await
            .unwrap();

        let dead = broker.dead_letters();
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].1, "encode failed");
        assert!(broker.is_drained());
    }

    #[tokio::test]
    async fn test_unavailable_broker_fails() {
        let broker = InMemoryBroker::new();
        broker.set_unavailable(true);
        assert!(matches!(broker.ping().await, Err(QueueError::ConnectionFailed(_))));
        assert!(broker.enqueue(&job()).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_delayed_jobs_promote_exactly_once() {
        let broker = std::sync::Arc::new(InMemoryBroker::new());
        let mut expected = Vec::new();
        for _ in 0..4 {
            let job = job();
            expected.push(job.job_id.clone());
            broker.enqueue(&job).await.unwrap();
        }

        let first = broker.consume("w1", 10, 4).await.unwrap();
        for delivery in &first {
            broker
                .retry_later(&delivery.message_id, &delivery.job.next_attempt(), Duration::from_secs(1))
                .await
                .unwrap();
        }
        assert_eq!(broker.delayed_len(), 4);
        assert_eq!(broker.pending_len(), 0);

        let (a, b) = tokio::join!(broker.consume("w1", 5_000, 4), broker.consume("w2", 5_000, 4));
        let mut got: Vec<_> = a.unwrap().into_iter().chain(b.unwrap()).map(|d| d.job).collect();
        assert!(got.iter().all(|job| job.attempt == 2));

        // Whatever one consumer missed is still deliverable, never lost
        got.extend(broker.consume("w3", 10, 4).await.unwrap().into_iter().map(|d| d.job));
        let mut ids: Vec<_> = got.into_iter().map(|job| job.job_id).collect();
        ids.sort_by(|x, y| x.as_str().cmp(y.as_str()));
        expected.sort_by(|x, y| x.as_str().cmp(y.as_str()));
        assert_eq!(ids, expected);
        assert_eq!(broker.delayed_len(), 0);
        assert_eq!(broker.ready_len(), 0);
    }
}
