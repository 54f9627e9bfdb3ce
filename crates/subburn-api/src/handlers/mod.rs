//! HTTP handlers.

pub mod captions;
pub mod health;
pub mod source;
pub mod videos;

use subburn_models::VideoId;

use crate::error::{ApiError, ApiResult};

pub use captions::submit_captions;
pub use health::{health, ready};
pub use source::upload_source;
pub use videos::{get_video_status, list_videos};

fn parse_video_id(raw: String) -> ApiResult<VideoId> {
    VideoId::parse(raw).map_err(|e| ApiError::bad_request(e.to_string()))
}
