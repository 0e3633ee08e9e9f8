//! Bearer-credential acquisition seam.
//!
//! Token issuance is an external concern (the original deployment defers to
//! a hosted identity provider), so the client only sees an async source that
//! may itself suspend.

use async_trait::async_trait;

use super::error::ApiError;

#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn token(&self) -> Result<String, ApiError>;
}

/// Fixed token taken from configuration.
pub struct StaticToken {
    token: String,
}

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn token(&self) -> Result<String, ApiError> {
        Ok(self.token.clone())
    }
}

/// Token re-read from a file on every request, so rotation does not require
/// a restart.
pub struct TokenFile {
    path: std::path::PathBuf,
}

impl TokenFile {
    pub fn new(path: impl Into<std::path::PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl TokenProvider for TokenFile {
    async fn token(&self) -> Result<String, ApiError> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(ApiError::TokenSource)?;
        Ok(raw.trim().to_string())
    }
}
