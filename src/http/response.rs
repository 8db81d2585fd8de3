//! Response handling and error mapping.
//!
//! # Responsibilities
//! - Map forwarding failures to HTTP status codes
//! - Render every failure as a JSON `{"error": "..."}` body
//!
//! # Design Decisions
//! - Upstream 4xx/5xx responses are not errors and never pass through here
//! - Only transport failures map to 502; local faults map to 500

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Failures surfaced by the proxy itself.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// No upstream target on the request and none configured.
    #[error("{0}")]
    MissingTarget(String),

    /// The supplied target is not an absolute http(s) URL.
    #[error("{0}")]
    InvalidTarget(String),

    /// Connection, DNS, or TLS failure reaching the upstream.
    #[error("upstream unreachable: {0}")]
    UpstreamUnreachable(String),

    /// The upstream did not answer within the configured bound.
    #[error("upstream timed out after {0:?}")]
    UpstreamTimeout(Duration),

    /// Unexpected fault building or dispatching the request.
    #[error("internal proxy error: {0}")]
    Internal(String),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::MissingTarget(_) | ProxyError::InvalidTarget(_) => StatusCode::BAD_REQUEST,
            ProxyError::UpstreamUnreachable(_) | ProxyError::UpstreamTimeout(_) => {
                StatusCode::BAD_GATEWAY
            }
            ProxyError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// JSON payload returned for every proxy failure.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            ProxyError::MissingTarget(_) | ProxyError::InvalidTarget(_) => {
                tracing::debug!(status = %status, error = %self, "Rejected proxy request");
            }
            ProxyError::UpstreamUnreachable(_) | ProxyError::UpstreamTimeout(_) => {
                tracing::warn!(status = %status, error = %self, "Upstream request failed");
            }
            ProxyError::Internal(_) => {
                tracing::error!(status = %status, error = %self, "Internal proxy fault");
            }
        }

        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
