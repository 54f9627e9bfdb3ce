//! API routes.

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{get_video_status, health, list_videos, ready, submit_captions, upload_source};
use crate::metrics::metrics_middleware;
use crate::middleware::{cors_layer, request_id, request_logging};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    let max_body = state.config.max_body_size;

    let video_routes = Router::new()
        .route("/videos", get(list_videos))
        .route("/videos/:video_id/captions", post(submit_captions))
        .route("/videos/:video_id/status", get(get_video_status))
        .route("/videos/:video_id/source", post(upload_source));

    Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .nest("/api", video_routes)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(request_logging))
        .layer(middleware::from_fn(request_id))
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(max_body))
        .layer(RequestBodyLimitLayer::new(max_body))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
