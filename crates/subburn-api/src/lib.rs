//! HTTP API for submitting caption jobs and polling their status.
//!
//! Submissions are validated, recorded as processing in the status store
//! and enqueued for the worker pool; the request returns immediately with
//! the job id.

pub mod background;
pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;

pub use background::BackgroundTasks;
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use services::{CaptionRequest, SubmissionService, SubmitResponse};
pub use state::AppState;
