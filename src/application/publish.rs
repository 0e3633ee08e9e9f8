//! Staged publish pipeline.
//!
//! Publishing is several dependent network operations with different failure
//! policies: the cover upload is best-effort, the metadata/content save and
//! the snapshot upload are required. The per-id `Publish` guard is held for
//! the whole run and released on every exit path.

use std::path::PathBuf;
use std::sync::Arc;

use askama::Template;
use metrics::counter;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, info, warn};
use url::Url;

use crate::application::notify::NoticeHub;
use crate::application::render::{
    SnapshotCover, SnapshotDocument, derive_slug, format_publish_date, snapshot_filename,
};
use crate::application::store::PostStore;
use crate::application::tracker::{OperationKind, OperationTracker};
use crate::domain::entities::{CoverImage, PostId, PostRecord};
use crate::domain::types::PostStatus;
use crate::infra::api::models::{AssetResponse, PostSaveRequest};
use crate::infra::api::{ApiClient, ApiError, AssetUpload};

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("a publish for this post is already in flight")]
    Busy,
    #[error("failed to load post for publishing: {0}")]
    Load(#[source] ApiError),
    #[error("save failed: {0}")]
    Save(#[source] ApiError),
    #[error("snapshot upload failed: {0}")]
    Snapshot(#[source] ApiError),
    #[error("snapshot render failed: {0}")]
    Render(#[from] askama::Error),
    #[error("failed to read staged cover {path}: {source}")]
    CoverRead {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Editor form state handed to the pipeline.
#[derive(Debug, Clone, Default)]
pub struct PublishForm {
    pub title: String,
    /// Blank means "derive from title".
    pub slug: String,
    pub tags: Vec<String>,
    pub summary: Option<String>,
    pub raw_html: String,
    pub cover_caption: Option<String>,
    /// Local image file staged for upload, if the author picked a new one.
    pub staged_cover: Option<PathBuf>,
}

#[derive(Debug)]
pub struct PublishOutcome {
    pub saved: PostRecord,
    pub snapshot: AssetResponse,
    /// Public link to open for preview.
    pub preview_link: String,
    /// Detail of a tolerated cover-stage failure, when one occurred.
    pub cover_failure: Option<String>,
}

#[derive(Clone)]
pub struct PublishService {
    store: Arc<PostStore>,
    tracker: Arc<OperationTracker>,
    api: Arc<ApiClient>,
    notices: NoticeHub,
    /// Serving root the snapshot's base tag points at.
    asset_base: String,
}

impl PublishService {
    pub fn new(
        store: Arc<PostStore>,
        tracker: Arc<OperationTracker>,
        api: Arc<ApiClient>,
        notices: NoticeHub,
        asset_base: String,
    ) -> Self {
        Self {
            store,
            tracker,
            api,
            notices,
            asset_base,
        }
    }

    /// Save metadata and content as a draft without publishing.
    pub async fn save_draft(
        &self,
        id: &PostId,
        form: &PublishForm,
    ) -> Result<PostRecord, PublishError> {
        let existing = self.load(id).await?;
        let cover = existing.cover_image.clone();
        self.save(id, form, cover.as_ref()).await
    }

    /// Run the full pipeline: best-effort cover upload, required save,
    /// required snapshot render + upload, then hand back the preview link.
    pub async fn publish(
        &self,
        id: &PostId,
        form: &PublishForm,
    ) -> Result<PublishOutcome, PublishError> {
        let Some(_guard) = self.tracker.begin_guard(id, OperationKind::Publish) else {
            return Err(PublishError::Busy);
        };

        let existing = self.load(id).await?;

        // Stage 1: cover upload. A failed image must never block the text.
        let (cover, cover_failure) = self.upload_cover(id, form, existing.cover_image).await;

        // Stage 2: save. Required.
        let saved = self.save(id, form, cover.as_ref()).await?;

        // Stage 3: snapshot render + upload. Required.
        let slug = derive_slug(&form.title, &form.slug);
        let html = self.render_document(form, cover.as_ref(), Some(OffsetDateTime::now_utc()))?;
        let snapshot = self
            .api
            .upload_html_snapshot(AssetUpload {
                bytes: html.into_bytes(),
                filename: snapshot_filename(&slug),
                content_type: "text/html".to_string(),
                alt: Some(format!("HTML snapshot for {}", form.title)),
                caption: Some(self.caption_or_title(form)),
                post_id: Some(id.clone()),
            })
            .await
            .map_err(|err| {
                counter!("scrittoio_publish_stage_failure_total", "stage" => "snapshot")
                    .increment(1);
                self.notices.error("publish: snapshot upload", err.detail());
                PublishError::Snapshot(err)
            })?;

        let preview_link = snapshot.public_link.clone();
        info!(post_id = %id, preview = %preview_link, "post published");

        Ok(PublishOutcome {
            saved,
            snapshot,
            preview_link,
            cover_failure,
        })
    }

    async fn load(&self, id: &PostId) -> Result<PostRecord, PublishError> {
        if let Some(record) = self.store.find(id) {
            return Ok(record);
        }
        // Editor prefill path: the editor may target a post the list view
        // never loaded.
        self.api.get_post(id).await.map_err(PublishError::Load)
    }

    /// Stage 1. Returns the cover to reference going forward and the detail
    /// text of a tolerated failure, if any.
    async fn upload_cover(
        &self,
        id: &PostId,
        form: &PublishForm,
        previous: Option<CoverImage>,
    ) -> (Option<CoverImage>, Option<String>) {
        let Some(path) = &form.staged_cover else {
            return (previous, None);
        };

        let staged = match self.read_cover(path).await {
            Ok(staged) => staged,
            Err(err) => return self.tolerate_cover_failure(previous, &err.to_string()),
        };

        let alt = format!("Cover image for {}", self.title_or_fallback(form));
        let caption = self.caption_or_title(form);
        let upload = AssetUpload {
            bytes: staged.0,
            filename: staged.1,
            content_type: staged.2,
            alt: Some(alt.clone()),
            caption: Some(caption.clone()),
            post_id: Some(id.clone()),
        };

        match self.api.upload_asset(upload).await {
            Ok(asset) => {
                self.warm_public_link(&asset.public_link).await;
                let cover = CoverImage {
                    asset_id: asset.asset_id,
                    public_link: asset.public_link,
                    alt: Some(alt),
                    caption: Some(caption),
                };
                (Some(cover), None)
            }
            Err(err) => self.tolerate_cover_failure(previous, &err.detail()),
        }
    }

    fn tolerate_cover_failure(
        &self,
        previous: Option<CoverImage>,
        detail: &str,
    ) -> (Option<CoverImage>, Option<String>) {
        counter!("scrittoio_publish_stage_failure_total", "stage" => "cover").increment(1);
        self.notices.warning("publish: cover image upload", detail);
        (previous, Some(detail.to_string()))
    }

    async fn read_cover(&self, path: &PathBuf) -> Result<(Vec<u8>, String, String), PublishError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| PublishError::CoverRead {
                path: path.display().to_string(),
                source,
            })?;
        let filename = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("cover.png")
            .to_string();
        let content_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Ok((bytes, filename, content_type))
    }

    /// Downstream caches in the original deployment fill on first read, so a
    /// throwaway request is fired at the fresh link. Failures are ignored.
    async fn warm_public_link(&self, link: &str) {
        let Ok(url) = Url::parse(link) else {
            debug!(link, "skipping warm-up of unparseable public link");
            return;
        };
        if let Err(err) = self.api.fetch_public(&url).await {
            debug!(link, error = %err, "public link warm-up failed");
        }
    }

    /// Stage 2.
    async fn save(
        &self,
        id: &PostId,
        form: &PublishForm,
        cover: Option<&CoverImage>,
    ) -> Result<PostRecord, PublishError> {
        let body_html = self.render_document(form, cover, None)?;
        let payload = PostSaveRequest {
            title: form.title.trim().to_string(),
            slug: derive_slug(&form.title, &form.slug),
            tags: form.tags.clone(),
            summary: form.summary.as_ref().map(|s| s.trim().to_string()),
            raw_html: form.raw_html.clone(),
            body_html: Some(body_html),
            status: PostStatus::Draft,
        };

        self.api.save_post(id, &payload).await.map_err(|err| {
            counter!("scrittoio_publish_stage_failure_total", "stage" => "save").increment(1);
            self.notices.error("publish: save", err.detail());
            PublishError::Save(err)
        })
    }

    fn render_document(
        &self,
        form: &PublishForm,
        cover: Option<&CoverImage>,
        published_at: Option<OffsetDateTime>,
    ) -> Result<String, PublishError> {
        let caption = self.caption_or_title(form);
        let doc = SnapshotDocument {
            title: form.title.trim(),
            summary: form.summary.as_deref().unwrap_or("").trim(),
            base_href: &self.asset_base,
            cover: cover.map(|c| SnapshotCover {
                link: c.public_link.clone(),
                caption: c.caption.clone().unwrap_or_else(|| caption.clone()),
            }),
            published_on: published_at.map(format_publish_date),
            body: &form.raw_html,
        };
        Ok(doc.render()?)
    }

    fn caption_or_title(&self, form: &PublishForm) -> String {
        form.cover_caption
            .as_ref()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| form.title.trim())
            .to_string()
    }

    fn title_or_fallback(&self, form: &PublishForm) -> String {
        let title = form.title.trim();
        if title.is_empty() {
            "post".to_string()
        } else {
            title.to_string()
        }
    }
}
