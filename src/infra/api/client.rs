//! HTTP client for the authoring API.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Method, Response, Url};
use serde::de::DeserializeOwned;

use crate::domain::entities::{PostId, PostRecord};
use crate::domain::types::PostStatus;

use super::error::ApiError;
use super::models::{AssetResponse, ErrorBody, MutationAck, PostCreatedResponse, PostSaveRequest};
use super::token::TokenProvider;

/// A staged binary destined for `POST assets` or `POST assets/html`.
#[derive(Debug, Clone)]
pub struct AssetUpload {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub content_type: String,
    pub alt: Option<String>,
    pub caption: Option<String>,
    pub post_id: Option<PostId>,
}

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base: Url,
    tokens: Arc<dyn TokenProvider>,
}

impl ApiClient {
    pub fn new(
        base: &str,
        tokens: Arc<dyn TokenProvider>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        // Trailing slash so relative joins extend the path instead of
        // replacing its last segment.
        let mut base = Url::parse(base)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let client = Client::builder()
            .user_agent(Self::user_agent())
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            base,
            tokens,
        })
    }

    pub fn user_agent() -> &'static str {
        concat!("scrittoio/", env!("CARGO_PKG_VERSION"))
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        self.base.join(path).map_err(ApiError::Url)
    }

    async fn bearer(&self) -> Result<String, ApiError> {
        let token = self.tokens.token().await?;
        Ok(format!("Bearer {token}"))
    }

    async fn request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        endpoint: &'static str,
        query: Option<&[(&str, String)]>,
        body: Option<serde_json::Value>,
    ) -> Result<T, ApiError> {
        let resp = self.dispatch(method, path, query, body).await?;
        Self::decode(resp, endpoint).await
    }

    async fn request_unit(
        &self,
        method: Method,
        path: &str,
        query: Option<&[(&str, String)]>,
    ) -> Result<(), ApiError> {
        let resp = self.dispatch(method, path, query, None).await?;
        Self::ensure_success(resp).await?;
        Ok(())
    }

    async fn dispatch(
        &self,
        method: Method,
        path: &str,
        query: Option<&[(&str, String)]>,
        body: Option<serde_json::Value>,
    ) -> Result<Response, ApiError> {
        let mut url = self.url(path)?;
        if let Some(q) = query {
            url.set_query(None);
            let mut qp = url.query_pairs_mut();
            for (k, v) in q {
                qp.append_pair(k, v);
            }
        }

        let mut req = self
            .client
            .request(method, url)
            .header(AUTHORIZATION, self.bearer().await?);
        if let Some(b) = body {
            req = req.json(&b);
        }
        Ok(req.send().await?)
    }

    async fn decode<T: DeserializeOwned>(
        resp: Response,
        endpoint: &'static str,
    ) -> Result<T, ApiError> {
        let bytes = Self::ensure_success(resp).await?;
        serde_json::from_slice(&bytes).map_err(|e| ApiError::malformed(endpoint, e.to_string()))
    }

    async fn ensure_success(resp: Response) -> Result<Bytes, ApiError> {
        let status = resp.status();
        let bytes = resp.bytes().await?;
        if status.is_success() {
            return Ok(bytes);
        }
        let detail = match serde_json::from_slice::<ErrorBody>(&bytes) {
            Ok(body) => body.detail,
            Err(_) => String::from_utf8_lossy(&bytes).into_owned(),
        };
        Err(ApiError::Status {
            status: status.as_u16(),
            detail,
        })
    }

    // ------------------------------------------------------------------
    // Posts
    // ------------------------------------------------------------------

    pub async fn list_posts(&self, limit: u32, skip: u32) -> Result<Vec<PostRecord>, ApiError> {
        let q = vec![("limit", limit.to_string()), ("skip", skip.to_string())];
        self.request_json(Method::GET, "posts", "posts.list", Some(&q), None)
            .await
    }

    pub async fn get_post(&self, id: &PostId) -> Result<PostRecord, ApiError> {
        let path = format!("posts/{id}");
        self.request_json(Method::GET, &path, "posts.get", None, None)
            .await
    }

    /// Create an empty draft; the server assigns the id.
    pub async fn create_post(&self) -> Result<PostId, ApiError> {
        let created: PostCreatedResponse = self
            .request_json(Method::POST, "posts", "posts.create", None, None)
            .await?;
        Ok(created.id)
    }

    pub async fn save_post(
        &self,
        id: &PostId,
        payload: &PostSaveRequest,
    ) -> Result<PostRecord, ApiError> {
        let path = format!("posts/{id}");
        let body = serde_json::to_value(payload)
            .map_err(|e| ApiError::InvalidInput(e.to_string()))?;
        self.request_json(Method::PATCH, &path, "posts.save", None, Some(body))
            .await
    }

    pub async fn set_status(
        &self,
        id: &PostId,
        status: PostStatus,
    ) -> Result<MutationAck, ApiError> {
        let path = format!("posts/{id}/status");
        let q = vec![("status", status.as_str().to_string())];
        self.request_json(Method::PATCH, &path, "posts.status", Some(&q), None)
            .await
    }

    pub async fn soft_delete(&self, id: &PostId) -> Result<MutationAck, ApiError> {
        let path = format!("posts/{id}/delete");
        self.request_json(Method::PATCH, &path, "posts.soft_delete", None, None)
            .await
    }

    /// Restore returns the full server copy of the record.
    pub async fn restore(&self, id: &PostId) -> Result<PostRecord, ApiError> {
        let path = format!("posts/{id}/restore");
        self.request_json(Method::PATCH, &path, "posts.restore", None, None)
            .await
    }

    pub async fn purge(&self, id: &PostId) -> Result<(), ApiError> {
        let path = format!("posts/{id}");
        self.request_unit(Method::DELETE, &path, None).await
    }

    // ------------------------------------------------------------------
    // Assets
    // ------------------------------------------------------------------

    pub async fn upload_asset(&self, upload: AssetUpload) -> Result<AssetResponse, ApiError> {
        self.upload_multipart("assets", "assets.upload", upload)
            .await
    }

    pub async fn upload_html_snapshot(
        &self,
        upload: AssetUpload,
    ) -> Result<AssetResponse, ApiError> {
        self.upload_multipart("assets/html", "assets.upload_html", upload)
            .await
    }

    async fn upload_multipart(
        &self,
        path: &str,
        endpoint: &'static str,
        upload: AssetUpload,
    ) -> Result<AssetResponse, ApiError> {
        let url = self.url(path)?;
        let part = reqwest::multipart::Part::bytes(upload.bytes)
            .file_name(upload.filename)
            .mime_str(&upload.content_type)
            .map_err(|e| ApiError::InvalidInput(e.to_string()))?;
        let mut form = reqwest::multipart::Form::new().part("file", part);
        if let Some(alt) = upload.alt {
            form = form.text("alt", alt);
        }
        if let Some(caption) = upload.caption {
            form = form.text("caption", caption);
        }
        if let Some(post_id) = upload.post_id {
            form = form.text("post_id", post_id.to_string());
        }

        let resp = self
            .client
            .post(url)
            .header(AUTHORIZATION, self.bearer().await?)
            .multipart(form)
            .send()
            .await?;
        Self::decode(resp, endpoint).await
    }

    /// Plain unauthenticated GET used for public asset links (cover images,
    /// warm-up requests). Returns the body only on a success status.
    pub async fn fetch_public(&self, url: &Url) -> Result<Bytes, ApiError> {
        let resp = self.client.get(url.clone()).send().await?;
        Self::ensure_success(resp).await
    }
}
