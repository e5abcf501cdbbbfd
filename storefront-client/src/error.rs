//! Client error types

use thiserror::Error;

/// Client error type
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Structured error body returned by the ordering API
    #[error("API error {code}: {message}")]
    Api { code: i32, message: String },

    /// Invalid response format
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Authentication required
    #[error("Authentication required")]
    Unauthorized,

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Missing or malformed configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// No location could be determined for the configured organization
    #[error("Location resolution failed: {0}")]
    Resolution(String),

    /// Ordering is unavailable for this session (menu-only mode)
    #[error("{0}")]
    SessionUnavailable(String),

    /// Durable cart id storage failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// The owning synchronizer was torn down while the call was in flight
    #[error("Cancelled")]
    Cancelled,
}

impl ClientError {
    /// Text placed into the UI-visible error slot
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Api { message, .. } if !message.is_empty() => message.clone(),
            ClientError::SessionUnavailable(message) => message.clone(),
            ClientError::NotFound(text) | ClientError::Validation(text) if !text.is_empty() => {
                text.clone()
            }
            other => other.to_string(),
        }
    }

    /// Errors that must reach the page shell instead of being converted to state
    pub fn is_fatal(&self) -> bool {
        matches!(self, ClientError::Config(_) | ClientError::Resolution(_))
    }
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;
