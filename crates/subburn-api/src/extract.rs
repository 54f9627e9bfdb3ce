//! Request extractors.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use subburn_models::OwnerId;

use crate::error::ApiError;

/// Header carrying the caller's owner id. Authentication happens upstream.
pub const OWNER_HEADER: &str = "X-Owner-Id";

/// Owner of the request, taken from [`OWNER_HEADER`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Owner(pub OwnerId);

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Owner {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(OWNER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ApiError::unauthorized(format!("Missing {} header", OWNER_HEADER)))?;

        let owner = OwnerId::parse(value).map_err(|e| ApiError::bad_request(e.to_string()))?;
        Ok(Owner(owner))
    }
}
