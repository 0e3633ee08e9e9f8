//! Cover image fetching and local handle lifecycle.
//!
//! Remote cover links are cross-origin, so rendering surfaces work from a
//! locally held copy: a fetch produces an [`ImageHandle`] allocated from the
//! shared [`HandleRegistry`], and the handle is revoked exactly once when the
//! consumer moves to a new source, clears it, or is torn down. The registry
//! is the analogue of an object-URL table; it exists so leaks and double
//! releases are observable instead of silent.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use metrics::counter;
use tracing::{debug, warn};
use url::Url;

use crate::infra::api::ApiClient;
use crate::util::sync::mutex_lock;

const SOURCE: &str = "application::covers";

/// Locally held image bytes, valid until revoked through the registry.
#[derive(Debug)]
pub struct ImageHandle {
    id: u64,
    bytes: Bytes,
}

impl ImageHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }
}

/// Allocation table for live image handles.
#[derive(Default)]
pub struct HandleRegistry {
    next_id: AtomicU64,
    live: Mutex<HashSet<u64>>,
    allocated: AtomicU64,
    revoked: AtomicU64,
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&self, bytes: Bytes) -> ImageHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        mutex_lock(&self.live, SOURCE, "allocate").insert(id);
        self.allocated.fetch_add(1, Ordering::Relaxed);
        counter!("scrittoio_cover_handle_alloc_total").increment(1);
        ImageHandle { id, bytes }
    }

    pub fn revoke(&self, handle: ImageHandle) {
        let removed = mutex_lock(&self.live, SOURCE, "revoke").remove(&handle.id);
        if removed {
            self.revoked.fetch_add(1, Ordering::Relaxed);
            counter!("scrittoio_cover_handle_revoke_total").increment(1);
        } else {
            // Handles are consumed on revoke, so reaching this means the
            // handle was allocated by a different registry.
            warn!(handle_id = handle.id, "revoke of unknown image handle");
        }
    }

    pub fn live_count(&self) -> usize {
        mutex_lock(&self.live, SOURCE, "live_count").len()
    }

    pub fn allocated_total(&self) -> u64 {
        self.allocated.load(Ordering::Relaxed)
    }

    pub fn revoked_total(&self) -> u64 {
        self.revoked.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Idle,
    Loading,
    Loaded,
    Error,
}

/// One rendering consumer's view of a cover image.
///
/// Slots are deliberately per-consumer: two cards showing the same remote
/// URL each fetch and hold independent handles. Sharing would be an
/// optimization, not a correctness requirement.
pub struct CoverSlot {
    api: Arc<ApiClient>,
    registry: Arc<HandleRegistry>,
    state: SlotState,
    handle: Option<ImageHandle>,
}

impl CoverSlot {
    pub fn new(api: Arc<ApiClient>, registry: Arc<HandleRegistry>) -> Self {
        Self {
            api,
            registry,
            state: SlotState::Idle,
            handle: None,
        }
    }

    pub fn state(&self) -> SlotState {
        self.state
    }

    pub fn handle(&self) -> Option<&ImageHandle> {
        self.handle.as_ref()
    }

    /// Point the slot at a new source (or none). The previously held handle
    /// is released before the new fetch starts, exactly once; `None` parks
    /// the slot in `Idle`. A fetch failure lands in `Error` with no handle
    /// and the surface falls back to its placeholder.
    pub async fn set_source(&mut self, source: Option<&Url>) -> SlotState {
        self.release();

        let Some(url) = source else {
            self.state = SlotState::Idle;
            return self.state;
        };

        self.state = SlotState::Loading;
        match self.api.fetch_public(url).await {
            Ok(bytes) => {
                debug!(url = %url, size = bytes.len(), "cover image loaded");
                self.handle = Some(self.registry.allocate(bytes));
                self.state = SlotState::Loaded;
            }
            Err(err) => {
                warn!(url = %url, error = %err, "cover image fetch failed");
                counter!("scrittoio_cover_fetch_error_total").increment(1);
                self.state = SlotState::Error;
            }
        }
        self.state
    }

    fn release(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.registry.revoke(handle);
        }
    }
}

impl Drop for CoverSlot {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_counts_alloc_and_revoke() {
        let registry = HandleRegistry::new();

        let a = registry.allocate(Bytes::from_static(b"a"));
        let b = registry.allocate(Bytes::from_static(b"b"));
        assert_eq!(registry.live_count(), 2);
        assert_ne!(a.id(), b.id());

        registry.revoke(a);
        assert_eq!(registry.live_count(), 1);
        assert_eq!(registry.allocated_total(), 2);
        assert_eq!(registry.revoked_total(), 1);

        registry.revoke(b);
        assert_eq!(registry.live_count(), 0);
    }

    #[test]
    fn handle_exposes_bytes() {
        let registry = HandleRegistry::new();
        let handle = registry.allocate(Bytes::from_static(b"png-bytes"));
        assert_eq!(handle.bytes().as_ref(), b"png-bytes");
        registry.revoke(handle);
    }
}
