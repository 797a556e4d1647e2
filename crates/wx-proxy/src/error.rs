use axum::http::header::InvalidHeaderValue;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use wx_core::NetworkError;

/// Failures while forwarding a request to a proxy target
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("Invalid upstream URL for {prefix}: {source}")]
    InvalidTarget {
        prefix: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Invalid Host header for target: {0}")]
    InvalidHost(#[from] InvalidHeaderValue),

    #[error("Failed to read request body: {0}")]
    Body(#[source] axum::Error),

    #[error("{prefix} -> {upstream}: {source}")]
    Upstream {
        prefix: String,
        upstream: String,
        #[source]
        source: NetworkError,
    },

    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl ProxyError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::Body(_) => StatusCode::BAD_REQUEST,
            ProxyError::Upstream {
                source: NetworkError::Timeout,
                ..
            } => StatusCode::GATEWAY_TIMEOUT,
            ProxyError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            ProxyError::InvalidTarget { .. } | ProxyError::InvalidHost(_) | ProxyError::Client(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        tracing::error!("http proxy error: {}", self);
        let reason = status.canonical_reason().unwrap_or("Proxy Error");
        (status, reason.to_string()).into_response()
    }
}
