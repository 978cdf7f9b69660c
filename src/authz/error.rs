//! Error types for authorization checks.

use thiserror::Error;

/// Errors that fail a check call outright.
///
/// A deny from the forward-auth authority is not an error; it is a
/// [`Response`](super::Response) with `allow == false`.
#[derive(Debug, Error)]
pub enum AuthzError {
    /// The check request did not carry the HTTP attributes we need.
    #[error("conversion error: {message}")]
    Conversion {
        /// Error message
        message: String,
    },

    /// The forward-auth call failed at the transport level, or its redirect
    /// location could not be parsed.
    #[error("upstream error: {message}")]
    Upstream {
        /// Error message
        message: String,
    },
}

impl AuthzError {
    /// Create a conversion error
    pub fn conversion(msg: impl Into<String>) -> Self {
        Self::Conversion {
            message: msg.into(),
        }
    }

    /// Create an upstream error
    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::Upstream {
            message: msg.into(),
        }
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthzError::Conversion { .. } => "conversion",
            AuthzError::Upstream { .. } => "upstream",
        }
    }
}

impl From<reqwest::Error> for AuthzError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::upstream(format!("forward auth request timed out: {}", err));
        }
        if err.is_connect() {
            return Self::upstream(format!("forward auth connection failed: {}", err));
        }
        Self::upstream(format!("forward auth request failed: {}", err))
    }
}

impl From<AuthzError> for tonic::Status {
    fn from(err: AuthzError) -> Self {
        tonic::Status::internal(err.to_string())
    }
}

/// Result type for authorization operations
pub type AuthzResult<T> = std::result::Result<T, AuthzError>;
