//! Caption burn-in worker.
//!
//! A [`WorkerPool`] consumes [`CaptionJob`](subburn_queue::CaptionJob)s from
//! the broker with bounded concurrency. Each attempt runs the pipeline in
//! its own work directory under a deadline, then records the outcome in the
//! status store and acknowledges, reschedules or dead-letters the delivery.

pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod workspace;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use executor::{JobOutcome, WorkerPool};
pub use logging::JobLogger;
pub use pipeline::{PipelineContext, PipelineOutput};
pub use workspace::JobWorkspace;
