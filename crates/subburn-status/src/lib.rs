//! Status store for captioning jobs.
//!
//! One record per (owner, video) under `owner:{owner}:video:{video}:status`,
//! plus a longer-lived `...:output_link` record after success. Both keys
//! expire by TTL; nothing here deletes them explicitly.

pub mod error;
pub mod kv;
pub mod memory;
pub mod redis_kv;
pub mod store;

pub use error::{StatusError, StatusResult};
pub use kv::KeyValueStore;
pub use memory::InMemoryKv;
pub use redis_kv::RedisKv;
pub use store::{StatusConfig, VideoStatusStore};
