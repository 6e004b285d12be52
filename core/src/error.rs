//! Error types for the storefront API client.
//!
//! # Design
//! Three failure classes reach callers: `Network` (no response at all),
//! `Http` (the backend answered with a non-2xx status) and `Application`
//! (a 2xx envelope carrying an `error` message). None of them is retried.
//! The remaining variants cover local encoding problems and the lifecycle
//! of the process-wide client.

use thiserror::Error;

/// Errors returned by `GymClient` parse methods, transports, the query
/// cache and the storefront controller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Transport, DNS or timeout failure: no response was received.
    #[error("network error: {0}")]
    Network(String),

    /// The backend returned a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// A successful response whose envelope carries an `error` message.
    #[error("{0}")]
    Application(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The view that issued the operation was unmounted.
    #[error("operation cancelled")]
    Cancelled,

    #[error("API client has not been initialized")]
    NotInitialized,

    #[error("API client is already initialized")]
    AlreadyInitialized,
}

impl ApiError {
    /// Status code for `Http` errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn application_error_displays_backend_message() {
        let err = ApiError::Application("Out of stock".to_string());
        assert_eq!(err.to_string(), "Out of stock");
    }

    #[test]
    fn http_error_exposes_status() {
        let err = ApiError::Http {
            status: 401,
            body: "{}".to_string(),
        };
        assert_eq!(err.status(), Some(401));
        assert_eq!(err.to_string(), "HTTP 401: {}");
        assert_eq!(ApiError::Cancelled.status(), None);
    }
}
