//! Error types for geocoding lookups

use thiserror::Error;

/// Result alias used throughout the library
pub type Result<T> = std::result::Result<T, GeocodeError>;

/// IPStack error codes that mean the account cannot make more calls
const QUOTA_ERROR_CODES: [i64; 3] = [101, 102, 104];

/// Errors surfaced by a lookup
#[derive(Error, Debug)]
pub enum GeocodeError {
    /// The HTTP call could not complete (connect, timeout, body read)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The provider answered with an error status or an in-body error
    #[error("provider error (status {status}): {message}")]
    Provider {
        /// HTTP status; in-body errors arrive with 200
        status: u16,
        /// Provider's own error code for in-body errors
        code: Option<i64>,
        message: String,
    },

    /// The body was not JSON or had an unexpected shape
    #[error("failed to parse provider response: {0}")]
    Parse(String),

    /// Missing key or invalid endpoint configuration
    #[error("configuration error: {0}")]
    Config(String),
}

impl GeocodeError {
    pub fn provider(status: u16, message: impl Into<String>) -> Self {
        Self::Provider {
            status,
            code: None,
            message: message.into(),
        }
    }

    /// Whether this error means the quota is used up or the key is rejected
    pub fn is_quota_exceeded(&self) -> bool {
        match self {
            Self::Provider { status, code, .. } => {
                *status == 403
                    || code.map_or(false, |c| QUOTA_ERROR_CODES.contains(&c))
            }
            _ => false,
        }
    }

    /// Whether the failure happened in transport rather than at the provider
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

impl From<serde_json::Error> for GeocodeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

impl From<url::ParseError> for GeocodeError {
    fn from(err: url::ParseError) -> Self {
        Self::Config(format!("invalid provider url: {}", err))
    }
}
