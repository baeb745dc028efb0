//! Error types for control plane API calls.

use thiserror::Error;

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors that can occur while talking to the control plane.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The HTTP request itself failed (connection, TLS, timeout).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server rejected the request.
    #[error("api error ({status}): {message}")]
    Api {
        /// HTTP status code returned by the server.
        status: u16,
        /// Server-provided error message.
        message: String,
    },

    /// The base URL could not be used to build a request.
    #[error("invalid base url: {0}")]
    BaseUrl(String),

    /// A response body could not be decoded.
    #[error("failed to decode {context}: {message}")]
    Decode {
        /// What was being decoded.
        context: &'static str,
        /// Underlying serde message.
        message: String,
    },

    /// A named resource does not exist on the server.
    #[error("{kind} not found: {name}")]
    NotFound {
        /// Resource kind (stack, formation, ...).
        kind: &'static str,
        /// The name that was looked up.
        name: String,
    },

    /// An asynchronous action finished unsuccessfully.
    #[error("action {id} failed: {message}")]
    ActionFailed {
        /// Server-side action id.
        id: i64,
        /// Failure message reported by the server.
        message: String,
    },

    /// Polling an asynchronous action exceeded its deadline.
    #[error("timed out waiting for {0}")]
    Timeout(String),

    /// An environment variable with the same key already exists.
    #[error("environment variable already exists: {0}")]
    DuplicateEnvVar(String),
}

impl ApiError {
    /// Creates a not found error for a named resource.
    #[must_use]
    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    /// Creates a decode error with context.
    #[must_use]
    pub fn decode(context: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Decode {
            context,
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let err = ApiError::Api {
            status: 404,
            message: "stack does not exist".into(),
        };
        assert_eq!(err.to_string(), "api error (404): stack does not exist");

        let err = ApiError::not_found("formation", "web");
        assert_eq!(err.to_string(), "formation not found: web");

        let err = ApiError::Timeout("action 42".into());
        assert_eq!(err.to_string(), "timed out waiting for action 42");
    }

    #[test]
    fn not_found_helper() {
        let err = ApiError::not_found("stack", "mystack");
        match err {
            ApiError::NotFound { kind, name } => {
                assert_eq!(kind, "stack");
                assert_eq!(name, "mystack");
            }
            _ => panic!("expected NotFound error"),
        }
    }
}
