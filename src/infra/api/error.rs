use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server error: status {status} {detail}")]
    Status { status: u16, detail: String },
    #[error("malformed response from {endpoint}: {message}")]
    MalformedResponse {
        endpoint: &'static str,
        message: String,
    },
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("failed to read credential source: {0}")]
    TokenSource(#[source] std::io::Error),
    #[error("invalid request input: {0}")]
    InvalidInput(String),
}

impl ApiError {
    pub fn malformed(endpoint: &'static str, message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            endpoint,
            message: message.into(),
        }
    }

    /// Server-provided detail text suitable for user-facing notices.
    pub fn detail(&self) -> String {
        match self {
            Self::Status { detail, .. } => detail.clone(),
            other => other.to_string(),
        }
    }
}
