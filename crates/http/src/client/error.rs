//! Client error types

use thiserror::Error;

/// Client error types
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport failure: connection refused, DNS, timeout, body decoding
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Login rejected by the backend
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// Server returned a 5xx status
    #[error("Server error {status}: {message}")]
    ServerError { status: u16, message: String },

    /// A request was still unauthorized after session recovery
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The backend rejected the refresh token
    #[error("Refresh token rejected: {0}")]
    RefreshInvalid(String),

    /// A refresh was needed but no refresh token is stored
    #[error("No refresh token available")]
    NoRefreshToken,

    /// The session was logged out while the request waited on a refresh
    #[error("Session ended")]
    SessionEnded,

    /// Resource not found
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Bad request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Forbidden
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Any other non-success status
    #[error("Request rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },

    /// One attachment failed to upload
    #[error("Failed to upload attachment '{file_name}': {source}")]
    AttachmentUpload {
        file_name: String,
        #[source]
        source: Box<ClientError>,
    },

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Durable session storage could not be read or written
    #[error("Session storage error: {0}")]
    Storage(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

impl ClientError {
    /// Create error from HTTP status code
    pub fn from_status(status: reqwest::StatusCode, message: String) -> Self {
        match status.as_u16() {
            400 => Self::BadRequest(message),
            401 => Self::AuthenticationFailed(message),
            403 => Self::Forbidden(message),
            404 => Self::NotFound(message),
            code @ 500..=599 => Self::ServerError {
                status: code,
                message,
            },
            code => Self::Rejected {
                status: code,
                message,
            },
        }
    }

    /// The session is gone and the user has to log in again
    pub const fn requires_login(&self) -> bool {
        matches!(
            self,
            Self::AuthenticationFailed(_)
                | Self::RefreshInvalid(_)
                | Self::NoRefreshToken
                | Self::SessionEnded
        )
    }

    pub const fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

/// Outcome handed to requests that waited on somebody else's refresh.
///
/// `ClientError` owns a `reqwest::Error` and cannot be cloned, so waiters
/// receive this reduced form instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RefreshFailure {
    Rejected(String),
    NoRefreshToken,
    Unavailable(String),
    SessionEnded,
}

impl From<&ClientError> for RefreshFailure {
    fn from(err: &ClientError) -> Self {
        match err {
            ClientError::RefreshInvalid(msg) => Self::Rejected(msg.clone()),
            ClientError::NoRefreshToken => Self::NoRefreshToken,
            ClientError::SessionEnded => Self::SessionEnded,
            other => Self::Unavailable(other.to_string()),
        }
    }
}

impl From<RefreshFailure> for ClientError {
    fn from(failure: RefreshFailure) -> Self {
        match failure {
            RefreshFailure::Rejected(msg) => Self::RefreshInvalid(msg),
            RefreshFailure::NoRefreshToken => Self::NoRefreshToken,
            RefreshFailure::Unavailable(msg) => Self::RefreshInvalid(format!("refresh failed: {msg}")),
            RefreshFailure::SessionEnded => Self::SessionEnded,
        }
    }
}

/// Pull a readable message out of an error body.
///
/// The backend answers `{"error": ...}` from its own views and
/// `{"detail": ...}` from framework-level checks; anything else is returned
/// as-is.
pub(crate) fn extract_message(status: reqwest::StatusCode, body: &str) -> String {
    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["error", "detail", "message"] {
            if let Some(serde_json::Value::String(msg)) = map.get(key) {
                return msg.clone();
            }
        }
    }
    if body.trim().is_empty() {
        status.to_string()
    } else {
        body.to_string()
    }
}
