//! Error types for the request pipeline and dashboard actions.
//!
//! # Taxonomy
//! ```text
//! 401 on a fresh request        → recovered by refresh + replay (never surfaces)
//! refresh itself fails          → ApiError::SessionExpired (terminal, forces re-login)
//! timeout / 5xx on retried read → retried with backoff, then degraded to empty data
//! anything else                 → propagated as-is, message kept for display
//! bad identifier                → ApiError::InvalidId, no request issued
//! ```

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

use crate::session::StorageError;

/// Classified failure from the transport layer (no HTTP status available).
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The request exceeded its deadline.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// Connection could not be established.
    #[error("connection failed: {0}")]
    Connect(String),

    /// Any other transport failure (invalid URL, body, protocol).
    #[error("transport error: {0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout(err.to_string())
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else {
            TransportError::Other(err.to_string())
        }
    }
}

/// Errors of the credential lifecycle.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// Refresh was requested while no refresh token is held.
    #[error("No refresh token available")]
    NoRefreshToken,

    /// The refresh endpoint answered with a non-success status.
    #[error("token refresh rejected with status {status}")]
    RefreshRejected { status: StatusCode, body: String },

    /// The refresh call never produced a response.
    #[error("token refresh failed: {0}")]
    Transport(#[from] TransportError),

    /// The refresh response could not be decoded.
    #[error("invalid token refresh response: {0}")]
    Decode(String),
}

/// Errors surfaced to callers of the pipeline and the dashboard actions.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The backend answered with a non-success status.
    #[error("request failed with status {status}")]
    Status { status: StatusCode, body: String },

    /// The request never produced a response.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The refresh attempted after a 401 failed; credentials were dropped.
    #[error("Session expired. Please log in again.")]
    SessionExpired(#[source] AuthError),

    /// A credential operation failed outside the interceptor.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// A response body did not match the expected shape.
    #[error("invalid response payload: {0}")]
    Decode(String),

    /// Client-side identifier validation rejected the input.
    #[error("Invalid file ID: {0:?}")]
    InvalidId(String),

    /// Registration returned a success status but a failure envelope.
    #[error("Registration failed: {0}")]
    Registration(String),

    /// Reading a local file for upload failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The session could not be persisted after login or registration.
    #[error("failed to persist session: {0}")]
    Storage(#[from] StorageError),
}

impl ApiError {
    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the failure is transient for bounded-retry reads:
    /// a timeout, or a server error status.
    pub fn is_retriable(&self) -> bool {
        match self {
            ApiError::Transport(TransportError::Timeout(_)) => true,
            ApiError::Status { status, .. } => status.is_server_error(),
            _ => false,
        }
    }

    /// Message stored in shared state for display.
    ///
    /// Prefers the backend's `error`, `errors` or `detail` field, then the raw
    /// body, then `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ApiError::Status { body, .. } => extract_backend_message(body)
                .unwrap_or_else(|| fallback.to_string()),
            ApiError::Registration(message) => message.clone(),
            ApiError::SessionExpired(_) | ApiError::InvalidId(_) => self.to_string(),
            ApiError::Transport(e) => e.to_string(),
            _ => fallback.to_string(),
        }
    }
}

fn extract_backend_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    let Ok(value) = serde_json::from_str::<Value>(trimmed) else {
        return Some(trimmed.to_string());
    };
    for key in ["error", "errors", "detail"] {
        match value.get(key) {
            Some(Value::String(s)) => return Some(s.clone()),
            Some(Value::Null) | None => continue,
            Some(other) => return Some(other.to_string()),
        }
    }
    Some(value.to_string())
}
