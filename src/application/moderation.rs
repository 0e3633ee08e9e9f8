//! Optimistic moderation actions over the post store.
//!
//! Every reversible action follows the same protocol: look up the target,
//! claim the (id, kind) guard, capture the pre-mutation values, apply the
//! local change immediately, then confirm or roll back when the request
//! resolves. Permanent deletion is the deferred variant: removal cannot be
//! guessed, so the store is only touched after the server confirms.

use std::future::Future;
use std::sync::Arc;

use metrics::counter;
use tracing::{debug, info};

use crate::application::notify::NoticeHub;
use crate::application::store::{PostPatch, PostStore};
use crate::application::tracker::{OperationKind, OperationTracker};
use crate::domain::entities::{PostId, PostRecord};
use crate::infra::api::{ApiClient, ApiError};

/// How a mutation attempt ended.
///
/// `RolledBack` means the request failed and local state again matches the
/// pre-action values (for the deferred delete, which never wrote, that holds
/// vacuously).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    Committed,
    RolledBack,
    Skipped(SkipReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Target id not present in local state; nothing to do, not surfaced.
    NotFound,
    /// Same (id, kind) already pending; dropped, never queued.
    InFlight,
}

#[derive(Clone)]
pub struct ModerationService {
    store: Arc<PostStore>,
    tracker: Arc<OperationTracker>,
    api: Arc<ApiClient>,
    notices: NoticeHub,
}

impl ModerationService {
    pub fn new(
        store: Arc<PostStore>,
        tracker: Arc<OperationTracker>,
        api: Arc<ApiClient>,
        notices: NoticeHub,
    ) -> Self {
        Self {
            store,
            tracker,
            api,
            notices,
        }
    }

    pub fn store(&self) -> &PostStore {
        &self.store
    }

    pub fn tracker(&self) -> &OperationTracker {
        &self.tracker
    }

    /// Reload the full collection from the server and reconcile the store.
    pub async fn refresh(&self, limit: u32, skip: u32) -> Result<usize, ApiError> {
        let posts = self.api.list_posts(limit, skip).await?;
        let count = posts.len();
        self.store.replace_all(posts);
        Ok(count)
    }

    /// Create an empty draft server-side; the caller follows up in the editor.
    pub async fn create(&self) -> Result<PostId, ApiError> {
        let id = self.api.create_post().await?;
        info!(post_id = %id, "created draft");
        Ok(id)
    }

    pub async fn toggle_status(&self, id: &PostId) -> MutationOutcome {
        self.run_reversible(
            id,
            OperationKind::StatusToggle,
            "toggle status",
            |record| PostPatch::status(record.status.toggled()),
            |patch| async move {
                let status = patch
                    .status
                    .ok_or_else(|| ApiError::InvalidInput("status patch is empty".to_string()))?;
                self.api.set_status(id, status).await?;
                // The ack carries no canonical record; the optimistic value
                // stands as committed.
                Ok(None)
            },
        )
        .await
    }

    pub async fn soft_delete(&self, id: &PostId) -> MutationOutcome {
        self.run_reversible(
            id,
            OperationKind::SoftDelete,
            "soft delete",
            |_| PostPatch::deleted(true),
            |_| async move {
                self.api.soft_delete(id).await?;
                Ok(None)
            },
        )
        .await
    }

    pub async fn restore(&self, id: &PostId) -> MutationOutcome {
        self.run_reversible(
            id,
            OperationKind::Restore,
            "restore",
            |_| PostPatch::deleted(false),
            |_| async move {
                // Restore returns the server copy; apply it so the server
                // wins over the optimistic guess.
                let record = self.api.restore(id).await?;
                Ok(Some(PostPatch::from_record(&record)))
            },
        )
        .await
    }

    /// Permanent delete, deferred: the record is only removed after the
    /// server confirms, because removal is not reversible.
    pub async fn purge(&self, id: &PostId) -> MutationOutcome {
        if self.store.find(id).is_none() {
            debug!(post_id = %id, "purge target not in store");
            return MutationOutcome::Skipped(SkipReason::NotFound);
        }
        let Some(_guard) = self
            .tracker
            .begin_guard(id, OperationKind::PermanentDelete)
        else {
            return MutationOutcome::Skipped(SkipReason::InFlight);
        };

        match self.api.purge(id).await {
            Ok(()) => {
                self.store.remove(id);
                info!(post_id = %id, "post permanently deleted");
                MutationOutcome::Committed
            }
            Err(err) => {
                self.notices.error("permanently delete post", err.detail());
                MutationOutcome::RolledBack
            }
        }
    }

    async fn run_reversible<'a, Fut>(
        &'a self,
        id: &'a PostId,
        kind: OperationKind,
        context: &'static str,
        compute_patch: impl FnOnce(&PostRecord) -> PostPatch,
        request: impl FnOnce(PostPatch) -> Fut,
    ) -> MutationOutcome
    where
        Fut: Future<Output = Result<Option<PostPatch>, ApiError>> + 'a,
    {
        let Some(record) = self.store.find(id) else {
            debug!(post_id = %id, kind = kind.as_str(), "mutation target not in store");
            return MutationOutcome::Skipped(SkipReason::NotFound);
        };
        let Some(_guard) = self.tracker.begin_guard(id, kind) else {
            return MutationOutcome::Skipped(SkipReason::InFlight);
        };

        let optimistic = compute_patch(&record);
        let rollback = optimistic.capture(&record);
        self.store.patch(id, &optimistic);

        match request(optimistic).await {
            Ok(canonical) => {
                if let Some(patch) = canonical {
                    // No-op when the record vanished while we were in flight.
                    self.store.patch(id, &patch);
                }
                debug!(post_id = %id, kind = kind.as_str(), "mutation committed");
                MutationOutcome::Committed
            }
            Err(err) => {
                self.store.patch(id, &rollback);
                counter!("scrittoio_mutation_rollback_total", "kind" => kind.as_str())
                    .increment(1);
                self.notices.error(context, err.detail());
                MutationOutcome::RolledBack
            }
        }
    }
}
