use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Classification assigned at the transport boundary.
/// Retry decisions match on this, never on message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Shared usage quota hit (HTTP 429 / RESOURCE_EXHAUSTED).
    RateLimited,
    /// Service answered, but not in the contracted shape.
    Malformed,
    /// Network failure or a non-success HTTP status.
    Transport,
    Unknown,
}

#[derive(Debug, Clone, Error)]
#[error("{kind:?}: {message}")]
pub struct ServiceError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ServiceError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RateLimited, message)
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Malformed, message)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transport, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unknown, message)
    }

    pub fn is_rate_limited(&self) -> bool {
        self.kind == ErrorKind::RateLimited
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(e: serde_json::Error) -> Self {
        ServiceError::malformed(e.to_string())
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(e: reqwest::Error) -> Self {
        // Body decode failures mean the service spoke, just not our schema
        if e.is_decode() {
            return ServiceError::malformed(e.to_string());
        }
        if e.status() == Some(reqwest::StatusCode::TOO_MANY_REQUESTS) {
            return ServiceError::rate_limited(e.to_string());
        }
        ServiceError::transport(e.to_string())
    }
}
