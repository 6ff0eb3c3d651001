// ABOUTME: Unified error taxonomy for the relay with HTTP status mapping
// ABOUTME: Defines RelayError, the JSON error response shape, and axum integration
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Relay Error Handling
//!
//! Every failure the relay can surface is a [`RelayError`] variant. The
//! taxonomy is deliberately small:
//!
//! - [`RelayError::SessionUnavailable`] — credential acquisition or refresh
//!   failed; surfaced as 503 and never retried further by the relay itself.
//! - [`RelayError::AuthExpired`] — internal signal that upstream rejected the
//!   current session. Consumed by the relay's single recovery attempt; if it
//!   ever escapes it maps to 503.
//! - [`RelayError::Upstream`] — any other non-success upstream response,
//!   surfaced verbatim with the upstream's own status code and body.
//! - [`RelayError::UpstreamTimeout`] — no data within the bounded window,
//!   surfaced as 504 and never treated as an auth failure.
//!
//! Malformed streamed frames are not errors at all; they are swallowed at the
//! SSE decoding layer.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for the relay
#[derive(Debug, Error)]
pub enum RelayError {
    /// Credential acquisition or refresh failed
    #[error("upstream session unavailable: {reason}")]
    SessionUnavailable {
        /// Why the session could not be obtained
        reason: String,
    },

    /// Upstream rejected the session as no longer valid (internal signal)
    #[error("upstream rejected the session as expired")]
    AuthExpired,

    /// Any other non-success upstream response, passed through verbatim
    #[error("upstream error ({status}): {body}")]
    Upstream {
        /// HTTP status returned by upstream
        status: u16,
        /// Response body returned by upstream
        body: String,
    },

    /// No data arrived from upstream within the bounded window
    #[error("no data from upstream within {timeout_secs}s")]
    UpstreamTimeout {
        /// The configured bound in seconds
        timeout_secs: u64,
    },

    /// The inbound request is invalid
    #[error("invalid request: {0}")]
    InvalidInput(String),

    /// Unexpected internal failure
    #[error("internal error: {0}")]
    Internal(String),
}

impl RelayError {
    /// Shorthand for a session-unavailable error
    pub fn session_unavailable(reason: impl Into<String>) -> Self {
        Self::SessionUnavailable {
            reason: reason.into(),
        }
    }

    /// Stable machine-readable code for the JSON error body
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::SessionUnavailable { .. } => "SESSION_UNAVAILABLE",
            Self::AuthExpired => "UPSTREAM_AUTH_EXPIRED",
            Self::Upstream { .. } => "UPSTREAM_ERROR",
            Self::UpstreamTimeout { .. } => "UPSTREAM_TIMEOUT",
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// HTTP status this error maps to on the downstream surface
    ///
    /// Upstream errors pass the upstream's own status through; a status that
    /// is not a valid HTTP code degrades to 502.
    #[must_use]
    pub fn http_status(&self) -> StatusCode {
        match self {
            // AuthExpired is consumed by the relay's recovery path; if it
            // escapes, the session is effectively unavailable.
            Self::SessionUnavailable { .. } | Self::AuthExpired => StatusCode::SERVICE_UNAVAILABLE,
            Self::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            Self::UpstreamTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Result type alias for convenience
pub type RelayResult<T> = Result<T, RelayError>;

/// HTTP error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error payload
    pub error: ErrorResponseDetails,
}

/// Error payload inside [`ErrorResponse`]
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponseDetails {
    /// Stable machine-readable code
    pub code: String,
    /// Human-readable message
    pub message: String,
}

impl From<&RelayError> for ErrorResponse {
    fn from(error: &RelayError) -> Self {
        Self {
            error: ErrorResponseDetails {
                code: error.code().to_owned(),
                message: error.to_string(),
            },
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.http_status();
        let body = ErrorResponse::from(&self);
        (status, Json(body)).into_response()
    }
}
