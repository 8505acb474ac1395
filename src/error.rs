//! Maitre error types

use std::time::Duration;

/// Maitre error types
#[derive(Debug, thiserror::Error)]
pub enum MaitreError {
    // Provider/network errors
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Deadline exceeded on the provider side, or the client gave up waiting.
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("empty response from provider")]
    EmptyResponse,

    // Data errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid tool definition: {0}")]
    InvalidTool(String),

    /// The tool list handed to the router has nothing it could ever match.
    #[error("tool registry has no usable entries")]
    EmptyRegistry,

    // Configuration errors
    #[error("no provider configured")]
    NoProvider,

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl MaitreError {
    /// Whether the error is worth retrying.
    ///
    /// Only timeouts and deadline signals qualify. Everything else,
    /// including rate limiting, is permanent.
    pub fn is_transient(&self) -> bool {
        matches!(self, MaitreError::Timeout(_))
    }

    /// Provider-supplied wait hint, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            MaitreError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

/// Result type alias for Maitre operations
pub type Result<T> = std::result::Result<T, MaitreError>;
