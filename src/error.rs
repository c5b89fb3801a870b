//! Error types for kfupm-chat
//!
//! This module defines all error types used throughout the application,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for chat operations
///
/// Covers input validation, the remote chat and feedback endpoints,
/// session persistence, configuration, and the usual I/O and
/// serialization failures.
#[derive(Error, Debug)]
pub enum ChatError {
    /// User input rejected before any network call (empty, too long)
    #[error("{0}")]
    Validation(String),

    /// The request to the chat service did not complete
    #[error("Network error: {0}")]
    Network(String),

    /// The chat service answered with a non-2xx status
    ///
    /// The message is the server-supplied `error` field, shown verbatim.
    #[error("{message}")]
    Server {
        /// HTTP status code returned by the service
        status: u16,
        /// Error text extracted from the response body
        message: String,
    },

    /// Session store read/write failure (logged, never shown to the user)
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Feedback submission failure (logged, never shown to the user)
    #[error("Feedback error: {0}")]
    Feedback(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// The API key needed to reach the chat service is missing
    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    /// Interactive command errors (unknown session id, bad arguments)
    #[error("Command error: {0}")]
    Command(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl ChatError {
    /// Whether the error text may be shown verbatim in the conversation
    ///
    /// Anything else is logged and replaced by a generic message.
    pub fn is_user_visible(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::Network(_) | Self::Server { .. }
        )
    }
}

/// Result type alias for chat operations
///
/// Uses `anyhow::Error` so call sites can attach context while the
/// underlying `ChatError` stays recoverable through `downcast_ref`.
pub type Result<T> = anyhow::Result<T>;
