//! Business logic behind the handlers.

pub mod submission;

pub use submission::{CaptionRequest, SubmissionService, SubmitResponse};
