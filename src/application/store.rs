//! In-memory post collection with immutable snapshots.
//!
//! Every mutation swaps in a fresh `Arc`'d vector; readers holding an older
//! snapshot keep a consistent view. Rollback after a failed optimistic write
//! is therefore just "patch back the field values captured before the write".

use std::sync::{Arc, RwLock};

use crate::domain::entities::{CoverImage, PostId, PostRecord};
use crate::domain::types::PostStatus;
use crate::util::sync::{rw_read, rw_write};

const SOURCE: &str = "application::store";

/// Shallow field merge applied to one record.
///
/// `cover_image` is doubly optional: the outer level is "touch this field at
/// all", the inner is the new value (including clearing the cover).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostPatch {
    pub status: Option<PostStatus>,
    pub is_deleted: Option<bool>,
    pub title: Option<String>,
    pub slug: Option<String>,
    pub summary: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
    pub raw_html: Option<String>,
    pub body_html: Option<Option<String>>,
    pub cover_image: Option<Option<CoverImage>>,
}

impl PostPatch {
    pub fn status(status: PostStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn deleted(is_deleted: bool) -> Self {
        Self {
            is_deleted: Some(is_deleted),
            ..Self::default()
        }
    }

    /// Capture the current values of exactly the fields this patch touches,
    /// producing the inverse patch used for rollback.
    pub fn capture(&self, record: &PostRecord) -> PostPatch {
        PostPatch {
            status: self.status.map(|_| record.status),
            is_deleted: self.is_deleted.map(|_| record.is_deleted),
            title: self.title.as_ref().map(|_| record.title.clone()),
            slug: self.slug.as_ref().map(|_| record.slug.clone()),
            summary: self.summary.as_ref().map(|_| record.summary.clone()),
            tags: self.tags.as_ref().map(|_| record.tags.clone()),
            raw_html: self.raw_html.as_ref().map(|_| record.raw_html.clone()),
            body_html: self.body_html.as_ref().map(|_| record.body_html.clone()),
            cover_image: self
                .cover_image
                .as_ref()
                .map(|_| record.cover_image.clone()),
        }
    }

    fn apply(&self, record: &mut PostRecord) {
        if let Some(status) = self.status {
            record.status = status;
        }
        if let Some(is_deleted) = self.is_deleted {
            record.is_deleted = is_deleted;
        }
        if let Some(title) = &self.title {
            record.title = title.clone();
        }
        if let Some(slug) = &self.slug {
            record.slug = slug.clone();
        }
        if let Some(summary) = &self.summary {
            record.summary = summary.clone();
        }
        if let Some(tags) = &self.tags {
            record.tags = tags.clone();
        }
        if let Some(raw_html) = &self.raw_html {
            record.raw_html = raw_html.clone();
        }
        if let Some(body_html) = &self.body_html {
            record.body_html = body_html.clone();
        }
        if let Some(cover_image) = &self.cover_image {
            record.cover_image = cover_image.clone();
        }
    }

    /// Patch carrying every field of a server-canonical record. Used when an
    /// endpoint returns the full copy and the server must win.
    pub fn from_record(record: &PostRecord) -> Self {
        Self {
            status: Some(record.status),
            is_deleted: Some(record.is_deleted),
            title: Some(record.title.clone()),
            slug: Some(record.slug.clone()),
            summary: Some(record.summary.clone()),
            tags: Some(record.tags.clone()),
            raw_html: Some(record.raw_html.clone()),
            body_html: Some(record.body_html.clone()),
            cover_image: Some(record.cover_image.clone()),
        }
    }
}

pub struct PostStore {
    posts: RwLock<Arc<Vec<PostRecord>>>,
}

impl Default for PostStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PostStore {
    pub fn new() -> Self {
        Self {
            posts: RwLock::new(Arc::new(Vec::new())),
        }
    }

    /// Current snapshot. Cheap to take, stays valid across later mutations.
    pub fn snapshot(&self) -> Arc<Vec<PostRecord>> {
        rw_read(&self.posts, SOURCE, "snapshot").clone()
    }

    pub fn find(&self, id: &PostId) -> Option<PostRecord> {
        self.snapshot().iter().find(|p| &p.id == id).cloned()
    }

    pub fn replace_all(&self, records: Vec<PostRecord>) {
        *rw_write(&self.posts, SOURCE, "replace_all") = Arc::new(records);
    }

    /// Shallow-merge `patch` into the record with `id`. Returns false (and
    /// leaves the snapshot untouched) when no such record exists; patching a
    /// vanished id is a defined no-op, not an error.
    pub fn patch(&self, id: &PostId, patch: &PostPatch) -> bool {
        let mut guard = rw_write(&self.posts, SOURCE, "patch");
        let Some(index) = guard.iter().position(|p| &p.id == id) else {
            return false;
        };
        let mut next = guard.as_ref().clone();
        patch.apply(&mut next[index]);
        *guard = Arc::new(next);
        true
    }

    /// Drop the record with `id` entirely. Returns false when absent.
    pub fn remove(&self, id: &PostId) -> bool {
        let mut guard = rw_write(&self.posts, SOURCE, "remove");
        if !guard.iter().any(|p| &p.id == id) {
            return false;
        }
        let next: Vec<PostRecord> = guard.iter().filter(|p| &p.id != id).cloned().collect();
        *guard = Arc::new(next);
        true
    }

    /// Records for the default view, honoring the show-deleted toggle.
    pub fn visible(&self, show_deleted: bool) -> Vec<PostRecord> {
        self.snapshot()
            .iter()
            .filter(|p| p.is_visible(show_deleted))
            .cloned()
            .collect()
    }

    pub fn deleted_count(&self) -> usize {
        self.snapshot().iter().filter(|p| p.is_deleted).count()
    }
}
