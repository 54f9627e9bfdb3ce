//! Worker metrics, recorded through the `metrics` facade.
//!
//! No recorder is installed by default, so these are no-ops unless the
//! embedding binary installs one.

use metrics::{counter, histogram};

/// Metric names as constants for consistency.
pub mod names {
    pub const JOBS_STARTED_TOTAL: &str = "subburn_jobs_started_total";
    pub const JOBS_COMPLETED_TOTAL: &str = "subburn_jobs_completed_total";
    pub const JOBS_FAILED_TOTAL: &str = "subburn_jobs_failed_total";
    pub const JOBS_RETRIED_TOTAL: &str = "subburn_jobs_retried_total";
    pub const ATTEMPT_DURATION_SECONDS: &str = "subburn_attempt_duration_seconds";
}

pub fn record_job_started() {
    counter!(names::JOBS_STARTED_TOTAL).increment(1);
}

pub fn record_job_completed() {
    counter!(names::JOBS_COMPLETED_TOTAL).increment(1);
}

/// Record a terminal failure, labelled by whether it was retryable.
pub fn record_job_failed(retryable: bool) {
    let labels = [("retryable", retryable.to_string())];
    counter!(names::JOBS_FAILED_TOTAL, &labels).increment(1);
}

pub fn record_job_retried(attempt: u32) {
    let labels = [("attempt", attempt.to_string())];
    counter!(names::JOBS_RETRIED_TOTAL, &labels).increment(1);
}

pub fn record_attempt_duration(outcome: &str, duration_secs: f64) {
    let labels = [("outcome", outcome.to_string())];
    histogram!(names::ATTEMPT_DURATION_SECONDS, &labels).record(duration_secs);
}
