//! Domain entities mirrored from the authoring API.

use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::domain::types::PostStatus;

/// Server-assigned post identifier.
///
/// Opaque and stable: the backing store hands out hex object ids, not UUIDs,
/// so this stays a string newtype and is never parsed or reused client-side.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(String);

impl PostId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PostId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverImage {
    pub asset_id: String,
    pub public_link: String,
    #[serde(default)]
    pub alt: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostRecord {
    pub id: PostId,
    pub title: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Editor content as produced by the WYSIWYG widget.
    #[serde(default)]
    pub raw_html: String,
    /// Fully rendered standalone document, when one has been built.
    #[serde(default)]
    pub body_html: Option<String>,
    pub status: PostStatus,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default)]
    pub cover_image: Option<CoverImage>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub published_at: Option<OffsetDateTime>,
}

impl PostRecord {
    /// Whether the record shows up in the default (non-deleted) view.
    pub fn is_visible(&self, show_deleted: bool) -> bool {
        show_deleted || !self.is_deleted
    }
}
