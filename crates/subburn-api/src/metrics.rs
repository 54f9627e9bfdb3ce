//! HTTP and submission metrics.

use std::time::Instant;

use axum::body::Body;
use axum::extract::MatchedPath;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};

/// Metric names as constants for consistency.
pub mod names {
    pub const HTTP_REQUESTS_TOTAL: &str = "subburn_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "subburn_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "subburn_http_requests_in_flight";

    pub const JOBS_SUBMITTED_TOTAL: &str = "subburn_jobs_submitted_total";
    pub const SUBMISSIONS_REJECTED_TOTAL: &str = "subburn_submissions_rejected_total";
    pub const SOURCE_UPLOADS_TOTAL: &str = "subburn_source_uploads_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", path.to_string()),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

pub fn record_job_submitted() {
    counter!(names::JOBS_SUBMITTED_TOTAL).increment(1);
}

/// Record a rejected submission (`reason` is "validation", "conflict" or "enqueue").
pub fn record_submission_rejected(reason: &str) {
    let labels = [("reason", reason.to_string())];
    counter!(names::SUBMISSIONS_REJECTED_TOTAL, &labels).increment(1);
}

pub fn record_source_upload(outcome: &str) {
    let labels = [("outcome", outcome.to_string())];
    counter!(names::SOURCE_UPLOADS_TOTAL, &labels).increment(1);
}

/// Metrics middleware for HTTP requests.
///
/// Labels use the route template so ids don't blow up cardinality.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);
    let response = next.run(request).await;
    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    record_http_request(&method, &path, response.status().as_u16(), start.elapsed().as_secs_f64());

    response
}
