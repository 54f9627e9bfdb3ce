//! Object storage for source videos, captioned outputs and thumbnails.
//!
//! This crate provides:
//! - The [`ObjectStore`] port the worker and API are written against
//! - A Cloudflare R2 (S3-compatible) client
//! - A local filesystem store for development and tests

pub mod client;
pub mod error;
pub mod kind;
pub mod local;
pub mod store;

pub use client::{R2Client, R2Config};
pub use error::{StorageError, StorageResult};
pub use kind::{object_key, ObjectKind};
pub use local::LocalObjectStore;
pub use store::{object_store_from_env, ObjectStore};
