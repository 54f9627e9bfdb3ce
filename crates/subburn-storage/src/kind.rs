//! Object categories and key layout.

use serde::{Deserialize, Serialize};

use crate::error::{StorageError, StorageResult};

/// What an uploaded object is. Decides its key prefix and content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    SourceVideo,
    CaptionedVideo,
    Thumbnail,
}

impl ObjectKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            ObjectKind::SourceVideo => "videos",
            ObjectKind::CaptionedVideo => "captioned",
            ObjectKind::Thumbnail => "thumbnails",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ObjectKind::SourceVideo | ObjectKind::CaptionedVideo => "video/mp4",
            ObjectKind::Thumbnail => "image/jpeg",
        }
    }

    pub fn default_name(&self) -> &'static str {
        match self {
            ObjectKind::SourceVideo => "source.mp4",
            ObjectKind::CaptionedVideo => "captioned.mp4",
            ObjectKind::Thumbnail => "thumbnail.jpg",
        }
    }
}

/// Build `{prefix}/{id}/{name}`, rejecting segments that could escape the prefix.
pub fn object_key(kind: ObjectKind, id: &str, name: Option<&str>) -> StorageResult<String> {
    let name = name.unwrap_or_else(|| kind.default_name());
    for part in [id, name] {
        if part.is_empty() || part.contains('/') || part.contains('\\') || part == "." || part == ".." {
            return Err(StorageError::UnsafeKey(part.to_string()));
        }
    }
    Ok(format!("{}/{}/{}", kind.prefix(), id, name))
}
