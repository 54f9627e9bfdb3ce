//! Job queue for captioning jobs.
//!
//! Jobs travel as versioned JSON payloads on a Redis Stream read through a
//! consumer group. Failed attempts are parked in a sorted set until their
//! backoff expires and are then re-added to the stream as new deliveries.
//! Jobs that run out of attempts land on a dead-letter stream.

pub mod broker;
pub mod error;
pub mod job;
pub mod memory;
pub mod queue;

pub use broker::{Delivery, JobBroker};
pub use error::{QueueError, QueueResult};
pub use job::{CaptionJob, RetryPolicy, VideoSource, JOB_SCHEMA_VERSION};
pub use memory::InMemoryBroker;
pub use queue::{QueueConfig, RedisJobQueue};
