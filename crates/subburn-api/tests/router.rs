//! Router tests against in-memory backends.

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use subburn_api::{create_router, ApiConfig, AppState};
use subburn_models::{JobId, OwnerId, VideoId, VideoStatus};
use subburn_queue::InMemoryBroker;
use subburn_status::store::status_key;
use subburn_status::{InMemoryKv, KeyValueStore, StatusConfig, VideoStatusStore};
use subburn_storage::LocalObjectStore;

struct Harness {
    app: Router,
    state: AppState,
    kv: Arc<InMemoryKv>,
    broker: Arc<InMemoryBroker>,
    dir: TempDir,
}

fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let kv = Arc::new(InMemoryKv::new());
    let broker = Arc::new(InMemoryBroker::new());
    let storage = Arc::new(LocalObjectStore::new(
        dir.path().join("objects"),
        "http://media.test",
    ));
    let config = ApiConfig {
        upload_dir: dir.path().join("uploads"),
        ..ApiConfig::default()
    };
    let status = VideoStatusStore::new(kv.clone(), StatusConfig::default());
    let state = AppState::with_parts(config, status, broker.clone(), storage);
    Harness {
        app: create_router(state.clone()),
        state,
        kv,
        broker,
        dir,
    }
}

impl Harness {
    /// Store the source object the default `source_key` points at.
    async fn store_source(&self, owner: &str, video: &str) {
        let path = self.dir.path().join(format!("objects/videos/{}/{}.mp4", owner, video));
        tokio::fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        tokio::fs::write(path, b"video").await.unwrap();
    }
}

fn caption_body() -> Value {
    json!({
        "input_link": "https://media.test/videos/owner1/video1.mp4",
        "segments": [
            {"id": 0, "start": 0.0, "end": 2.5, "text": "hello there"},
            {"id": 1, "start": 2.5, "end": 4.0, "text": "general kenobi"}
        ],
        "style": {
            "font_family": "Arial",
            "font_size_px": 48,
            "vertical_position_pct": 85.0,
            "position_origin": "top",
            "text_color": "#FFFFFF",
            "background_color": "#000000"
        }
    })
}

fn post_json(uri: &str, owner: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(owner) = owner {
        builder = builder.header("X-Owner-Id", owner);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, owner: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("X-Owner-Id", owner)
        .body(Body::empty())
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_submit_returns_accepted_and_enqueues() {
    let h = harness();
    h.store_source("owner1", "video1").await;
    let response = h
        .app
        .clone()
        .oneshot(post_json("/api/videos/video1/captions", Some("owner1"), &caption_body()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let body = json_body(response).await;
    assert_eq!(body["status"], "processing");
    assert!(body["job_id"].as_str().is_some());
    assert_eq!(h.broker.ready_len(), 1);

    let response = h
        .app
        .oneshot(get("/api/videos/video1/status", "owner1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let status = json_body(response).await;
    assert_eq!(status["status"], "processing");
    assert_eq!(status["input_link"], "https://media.test/videos/owner1/video1.mp4");
    assert_eq!(status["job_id"], body["job_id"]);
}

#[tokio::test]
async fn test_second_submit_while_processing_conflicts() {
    let h = harness();
    h.store_source("owner1", "video1").await;
    let first = h
        .app
        .clone()
        .oneshot(post_json("/api/videos/video1/captions", Some("owner1"), &caption_body()))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::ACCEPTED);

    let second = h
        .app
        .oneshot(post_json("/api/videos/video1/captions", Some("owner1"), &caption_body()))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);
    assert!(json_body(second).await["detail"].as_str().is_some());
    assert_eq!(h.broker.ready_len(), 1);
}

#[tokio::test]
async fn test_missing_owner_is_unauthorized() {
    let h = harness();
    let response = h
        .app
        .oneshot(post_json("/api/videos/video1/captions", None, &caption_body()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_empty_segments_is_bad_request() {
    let h = harness();
    let mut body = caption_body();
    body["segments"] = json!([]);

    let response = h
        .app
        .oneshot(post_json("/api/videos/video1/captions", Some("owner1"), &body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(h.broker.ready_len(), 0);
}

#[tokio::test]
async fn test_inverted_segment_times_is_bad_request() {
    let h = harness();
    let mut body = caption_body();
    body["segments"] = json!([{"id": 0, "start": 3.0, "end": 1.0, "text": "backwards"}]);

    let response = h
        .app
        .oneshot(post_json("/api/videos/video1/captions", Some("owner1"), &body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_video_is_not_found() {
    let h = harness();
    let response = h
        .app
        .oneshot(get("/api/videos/nothing/status", "owner1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_status_falls_back_to_output_link() {
    let h = harness();
    let owner = OwnerId::from_string("owner1");
    let video = VideoId::from_string("video1");
    let job = JobId::new();

    h.state
        .status
        .mark_processing(&owner, &video, &job, "https://media.test/in.mp4")
        .await
        .unwrap();
    h.state
        .status
        .mark_completed(
            &owner,
            &video,
            &job,
            "https://media.test/in.mp4",
            "https://media.test/out.mp4",
            "https://media.test/thumb.jpg",
        )
        .await
        .unwrap();
    // Simulate the short-lived status record expiring
    h.kv.delete(&status_key(&owner, &video)).await.unwrap();

    let response = h
        .app
        .oneshot(get("/api/videos/video1/status", "owner1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "completed");
    assert_eq!(body["output_link"], "https://media.test/out.mp4");
    assert!(body.get("job_id").is_none());
}

#[tokio::test]
async fn test_list_videos_groups_by_state() {
    let h = harness();
    let owner = OwnerId::from_string("owner1");
    let done = JobId::new();

    h.state
        .status
        .mark_processing(&owner, &VideoId::from_string("a"), &JobId::new(), "https://m/a.mp4")
        .await
        .unwrap();
    h.state
        .status
        .mark_processing(&owner, &VideoId::from_string("b"), &done, "https://m/b.mp4")
        .await
        .unwrap();
    h.state
        .status
        .mark_completed(
            &owner,
            &VideoId::from_string("b"),
            &done,
            "https://m/b.mp4",
            "https://m/b-out.mp4",
            "https://m/b.jpg",
        )
        .await
        .unwrap();
    h.state
        .status
        .mark_processing(
            &OwnerId::from_string("someone-else"),
            &VideoId::from_string("c"),
            &JobId::new(),
            "https://m/c.mp4",
        )
        .await
        .unwrap();

    let response = h.app.oneshot(get("/api/videos", "owner1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;

    let processing = body["processing"].as_array().unwrap();
    assert_eq!(processing.len(), 1);
    assert_eq!(processing[0]["video_id"], "a");

    let completed = body["completed"].as_array().unwrap();
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0]["video_id"], "b");
    assert_eq!(completed[0]["output_link"], "https://m/b-out.mp4");
}

#[tokio::test]
async fn test_source_upload_stores_object_in_background() {
    let h = harness();
    let request = Request::builder()
        .method("POST")
        .uri("/api/videos/video1/source")
        .header("X-Owner-Id", "owner1")
        .body(Body::from(vec![7u8; 4096]))
        .unwrap();

    let response = h.app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let body = json_body(response).await;
    assert_eq!(body["key"], "videos/owner1/video1.mp4");
    assert_eq!(body["input_link"], "http://media.test/videos/owner1/video1.mp4");

    assert!(h.state.tasks.shutdown(Duration::from_secs(5)).await);
    let stored = h.dir.path().join("objects/videos/owner1/video1.mp4");
    assert_eq!(tokio::fs::read(&stored).await.unwrap().len(), 4096);
}

#[tokio::test]
async fn test_submit_before_source_upload_finishes_conflicts() {
    let h = harness();

    let early = h
        .app
        .clone()
        .oneshot(post_json("/api/videos/video1/captions", Some("owner1"), &caption_body()))
        .await
        .unwrap();
    assert_eq!(early.status(), StatusCode::CONFLICT);
    assert!(json_body(early).await["detail"]
        .as_str()
        .unwrap()
        .contains("has not finished uploading"));
    assert_eq!(h.broker.ready_len(), 0);

    let upload = Request::builder()
        .method("POST")
        .uri("/api/videos/video1/source")
        .header("X-Owner-Id", "owner1")
        .body(Body::from(vec![1u8; 1024]))
        .unwrap();
    let response = h.app.clone().oneshot(upload).await.unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert!(h.state.tasks.shutdown(Duration::from_secs(5)).await);

    let late = h
        .app
        .oneshot(post_json("/api/videos/video1/captions", Some("owner1"), &caption_body()))
        .await
        .unwrap();
    assert_eq!(late.status(), StatusCode::ACCEPTED);
    assert_eq!(h.broker.ready_len(), 1);
}

#[tokio::test]
async fn test_empty_source_upload_is_rejected() {
    let h = harness();
    let request = Request::builder()
        .method("POST")
        .uri("/api/videos/video1/source")
        .header("X-Owner-Id", "owner1")
        .body(Body::empty())
        .unwrap();

    let response = h.app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health_and_ready() {
    let h = harness();
    let response = h
        .app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));

    let response = h
        .app
        .clone()
        .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "ready");

    h.broker.set_unavailable(true);
    let response = h
        .app
        .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = json_body(response).await;
    assert_eq!(body["checks"]["queue"]["status"], "error");
}

#[tokio::test]
async fn test_failed_status_allows_resubmission() {
    let h = harness();
    h.store_source("owner1", "video1").await;
    let owner = OwnerId::from_string("owner1");
    let video = VideoId::from_string("video1");
    let job = JobId::new();
    h.state
        .status
        .mark_processing(&owner, &video, &job, "https://m/in.mp4")
        .await
        .unwrap();
    h.state
        .status
        .mark_failed(&owner, &video, &job, "https://m/in.mp4", "boom")
        .await
        .unwrap();

    let response = h
        .app
        .oneshot(post_json("/api/videos/video1/captions", Some("owner1"), &caption_body()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let record = h.state.status.get_status(&owner, &video).await.unwrap().unwrap();
    assert_eq!(record.status, VideoStatus::Processing);
    assert_ne!(record.job_id, job);
}
