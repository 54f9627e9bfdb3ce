//! Broker tests against a live Redis.
//!
//! Run with: `REDIS_URL=redis://localhost:6379 cargo test -p subburn-queue -- --ignored`

use std::time::Duration;

use subburn_models::{JobId, OwnerId, SubtitleStyle, TranscriptionSegment, VideoId};
use subburn_queue::{CaptionJob, JobBroker, QueueConfig, RedisJobQueue, VideoSource};

fn queue() -> RedisJobQueue {
    let prefix = format!("subburn-test:{}", JobId::new());
    let config = QueueConfig {
        redis_url: std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string()),
        stream_name: format!("{}:jobs", prefix),
        consumer_group: format!("{}:workers", prefix),
        dlq_stream_name: format!("{}:dlq", prefix),
        delayed_set_name: format!("{}:jobs:delayed", prefix),
        ..QueueConfig::default()
    };
    RedisJobQueue::new(config).unwrap()
}

fn job() -> CaptionJob {
    CaptionJob::new(
        OwnerId::from("owner1"),
        VideoId::from("video1"),
        VideoSource::Object {
            key: "videos/video1/source.mp4".to_string(),
        },
        "https://cdn.example.com/videos/video1/source.mp4",
        vec![TranscriptionSegment::new(0, 0.0, 1.0, "hello")],
        SubtitleStyle::default(),
    )
}

#[tokio::test]
#[ignore = "requires Redis"]
async fn test_enqueue_consume_retry_dead_letter() {
    let queue = queue();
    queue.init().await.unwrap();
    queue.init().await.unwrap();

    let job = job();
    queue.enqueue(&job).await.unwrap();
    assert!(queue.enqueue(&job).await.is_err());

    let first = queue.consume("w1", 100, 1).await.unwrap();
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].job.job_id, job.job_id);

    queue
        .retry_later(&first[0].message_id, &first[0].job.next_attempt(), Duration::from_millis(50))
        .await
        .unwrap();
    assert_eq!(queue.delayed_len().await.unwrap(), 1);

    tokio::time::sleep(Duration::from_millis(100)).await;
    let second = queue.consume("w1", 100, 1).await.unwrap();
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].job.attempt, 2);

    queue
        .dead_letter(&second[0].message_id, &second[0].job, "boom")
        .await
        .unwrap();
    assert_eq!(queue.dlq_len().await.unwrap(), 1);
    assert_eq!(queue.len().await.unwrap(), 0);
}

#[tokio::test]
#[ignore = "requires Redis"]
async fn test_delayed_jobs_promote_exactly_once_across_consumers() {
    let queue = std::sync::Arc::new(queue());
    queue.init().await.unwrap();

    for _ in 0..5 {
        queue.enqueue(&job()).await.unwrap();
    }
    let first = queue.consume("w1", 100, 5).await.unwrap();
    assert_eq!(first.len(), 5);
    for delivery in &first {
        queue
            .retry_later(&delivery.message_id, &delivery.job.next_attempt(), Duration::from_millis(20))
            .await
            .unwrap();
    }
    assert_eq!(queue.delayed_len().await.unwrap(), 5);
    tokio::time::sleep(Duration::from_millis(50)).await;

    // Two consumers race to promote the same due members
    let (a, b) = tokio::join!(queue.consume("w1", 100, 10), queue.consume("w2", 100, 10));
    let mut ids: Vec<JobId> = a.unwrap().into_iter().chain(b.unwrap()).map(|d| d.job.job_id).collect();
    ids.sort_by(|x, y| x.as_str().cmp(y.as_str()));
    ids.dedup();

    assert_eq!(ids.len(), 5);
    assert_eq!(queue.delayed_len().await.unwrap(), 0);
}
