//! In-flight operation registry.
//!
//! One entry per (post id, operation kind). The registry is what disables
//! controls while a round trip is pending and what makes a doubled action a
//! rejected no-op instead of a silently queued second request.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use metrics::counter;
use tracing::debug;

use crate::domain::entities::PostId;
use crate::util::sync::mutex_lock;

const SOURCE: &str = "application::tracker";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    StatusToggle,
    SoftDelete,
    Restore,
    PermanentDelete,
    Publish,
}

impl OperationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OperationKind::StatusToggle => "status_toggle",
            OperationKind::SoftDelete => "soft_delete",
            OperationKind::Restore => "restore",
            OperationKind::PermanentDelete => "permanent_delete",
            OperationKind::Publish => "publish",
        }
    }
}

#[derive(Default)]
pub struct OperationTracker {
    in_flight: Mutex<HashSet<(PostId, OperationKind)>>,
}

impl OperationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record (id, kind) as in flight. Returns false, with no effect, when
    /// an operation of that kind is already pending for the id.
    pub fn begin(&self, id: &PostId, kind: OperationKind) -> bool {
        let inserted = mutex_lock(&self.in_flight, SOURCE, "begin")
            .insert((id.clone(), kind));
        if !inserted {
            debug!(post_id = %id, kind = kind.as_str(), "duplicate operation rejected");
            counter!("scrittoio_mutation_guard_reject_total", "kind" => kind.as_str())
                .increment(1);
        }
        inserted
    }

    /// Clear (id, kind) unconditionally. Idempotent.
    pub fn end(&self, id: &PostId, kind: OperationKind) {
        mutex_lock(&self.in_flight, SOURCE, "end").remove(&(id.clone(), kind));
    }

    pub fn is_active(&self, id: &PostId, kind: OperationKind) -> bool {
        mutex_lock(&self.in_flight, SOURCE, "is_active").contains(&(id.clone(), kind))
    }

    /// Any operation pending for the id, regardless of kind.
    pub fn is_busy(&self, id: &PostId) -> bool {
        mutex_lock(&self.in_flight, SOURCE, "is_busy")
            .iter()
            .any(|(tracked, _)| tracked == id)
    }

    /// `begin` with release tied to the returned guard's lifetime, so the
    /// entry is cleared on every exit path.
    pub fn begin_guard(
        self: &Arc<Self>,
        id: &PostId,
        kind: OperationKind,
    ) -> Option<TrackerGuard> {
        if !self.begin(id, kind) {
            return None;
        }
        Some(TrackerGuard {
            tracker: Arc::clone(self),
            id: id.clone(),
            kind,
        })
    }
}

pub struct TrackerGuard {
    tracker: Arc<OperationTracker>,
    id: PostId,
    kind: OperationKind,
}

impl Drop for TrackerGuard {
    fn drop(&mut self) {
        self.tracker.end(&self.id, self.kind);
    }
}
