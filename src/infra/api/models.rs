//! Request and response shapes for the authoring API.
//!
//! Decoding is strict per endpoint: a response missing the fields named here
//! fails as `ApiError::MalformedResponse` instead of falling through to
//! alternate field spellings.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::domain::entities::PostId;
use crate::domain::types::PostStatus;

fn default_post_status() -> PostStatus {
    PostStatus::Draft
}

/// Body for `PATCH posts/{id}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct PostSaveRequest {
    pub title: String,
    pub slug: String,
    pub tags: Vec<String>,
    pub summary: Option<String>,
    pub raw_html: String,
    pub body_html: Option<String>,
    #[serde(default = "default_post_status")]
    pub status: PostStatus,
}

/// `POST posts` acknowledgement.
#[derive(Debug, Serialize, Deserialize)]
pub struct PostCreatedResponse {
    pub id: PostId,
}

/// Acknowledgement for status/soft-delete mutations, which do not return the
/// updated record.
#[derive(Debug, Serialize, Deserialize)]
pub struct MutationAck {
    pub ok: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub at: OffsetDateTime,
}

/// `POST assets` / `POST assets/html` result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetResponse {
    pub asset_id: String,
    pub public_link: String,
    #[serde(default)]
    pub filename: Option<String>,
}

/// Error envelope the API attaches to non-success responses.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}
