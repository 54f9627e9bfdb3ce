//! Shared data models for the caption burn-in pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Transcription segments (the caption source)
//! - Subtitle styles, fonts and colors
//! - Job, owner and video identifiers
//! - Per-video status records kept in the status store

pub mod error;
pub mod ids;
pub mod segment;
pub mod status;
pub mod style;

// Re-export common types
pub use error::{ModelError, ModelResult};
pub use ids::{is_valid_id, JobId, OwnerId, VideoId};
pub use segment::TranscriptionSegment;
pub use status::{OutputLinkRecord, VideoStatus, VideoStatusRecord};
pub use style::{FontFamily, HexColor, LinePalette, PositionOrigin, SubtitleStyle};
