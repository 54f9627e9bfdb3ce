//! Status store against a live Redis.
//!
//! Run with: `REDIS_URL=redis://localhost:6379 cargo test -p subburn-status -- --ignored`

use std::sync::Arc;

use subburn_models::{JobId, OwnerId, VideoId, VideoStatus};
use subburn_status::{KeyValueStore, RedisKv, StatusConfig, VideoStatusStore};

fn redis_url() -> String {
    std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string())
}

#[tokio::test]
#[ignore = "requires Redis"]
async fn test_status_round_trip_and_ttl() {
    let kv = Arc::new(RedisKv::new(&redis_url()).unwrap());
    let owner = OwnerId::from(format!("test-{}", JobId::new()));
    let video = VideoId::from("video1");
    let job = JobId::new();

    let store = VideoStatusStore::new(kv.clone(), StatusConfig::default());
    store.mark_processing(&owner, &video, &job, "in").await.unwrap();
    store.mark_completed(&owner, &video, &job, "in", "out", "thumb").await.unwrap();

    let record = store.get_status(&owner, &video).await.unwrap().unwrap();
    assert_eq!(record.status, VideoStatus::Completed);

    let completed = store.list_completed(&owner).await.unwrap();
    assert_eq!(completed.len(), 1);

    let mut conn = redis::Client::open(redis_url().as_str())
        .unwrap()
        .get_multiplexed_async_connection()
        .await
        .unwrap();
    let ttl: i64 = redis::cmd("TTL")
        .arg(format!("owner:{}:video:video1:status", owner))
        .query_async(&mut conn)
        .await
        .unwrap();
    assert!(ttl > 0 && ttl <= 3600);

    kv.delete(&format!("owner:{}:video:video1:status", owner)).await.unwrap();
    kv.delete(&format!("owner:{}:video:video1:output_link", owner)).await.unwrap();
}
