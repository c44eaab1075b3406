// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types shared by every handler.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A failure reported by the remote service.
///
/// The `code` is the service error code (for example `DBInstanceNotFound`)
/// and is what error rule sets match on.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{code} (status {status_code}): {message}")]
#[serde(rename_all = "camelCase")]
pub struct RemoteError {
    /// Service error code
    pub code: String,
    /// HTTP status code returned by the service
    pub status_code: u16,
    /// Human-readable reason
    pub message: String,
}

impl RemoteError {
    /// Create a remote error.
    pub fn new(code: impl Into<String>, status_code: u16, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            status_code,
            message: message.into(),
        }
    }

    /// Client-side (4xx) error with the given code.
    pub fn client(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(code, 400, message)
    }

    /// Not-found (404) error with the given code.
    pub fn not_found(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(code, 404, message)
    }

    /// Server-side (5xx) error with the given code.
    pub fn service(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(code, 500, message)
    }
}

/// Errors raised inside a handler step.
#[derive(Debug, Clone, Error)]
pub enum HandlerError {
    /// The remote service rejected or failed the call
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// The request violates the resource contract (malformed or forbidden input)
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The service answered with a response shape the handler did not expect
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// The resource reached a state it cannot stabilize from
    #[error("not stabilized: {0}")]
    NotStabilized(String),

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl HandlerError {
    /// Returns the underlying remote error, if this is one.
    pub fn as_remote(&self) -> Option<&RemoteError> {
        match self {
            Self::Remote(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(err: serde_json::Error) -> Self {
        HandlerError::Serialization(err.to_string())
    }
}

/// Type alias for handler results.
pub type Result<T> = std::result::Result<T, HandlerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_error_display() {
        let err = RemoteError::not_found("DBInstanceNotFound", "DBInstance db-1 not found");
        assert_eq!(
            err.to_string(),
            "DBInstanceNotFound (status 404): DBInstance db-1 not found"
        );
    }

    #[test]
    fn test_handler_error_from_remote_is_transparent() {
        let err: HandlerError = RemoteError::service("InternalFailure", "boom").into();
        assert_eq!(err.to_string(), "InternalFailure (status 500): boom");
        assert_eq!(err.as_remote().map(|e| e.status_code), Some(500));
    }

    #[test]
    fn test_handler_error_display() {
        assert_eq!(
            HandlerError::InvalidRequest("EngineLifecycleSupport cannot be modified.".to_string())
                .to_string(),
            "invalid request: EngineLifecycleSupport cannot be modified."
        );
        assert!(
            HandlerError::UnexpectedResponse("x".to_string())
                .as_remote()
                .is_none()
        );
    }
}
