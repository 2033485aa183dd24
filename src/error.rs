//! Error types for the swipe review client

use thiserror::Error;

/// Result type alias for swipe review operations
pub type Result<T> = std::result::Result<T, SwipeError>;

#[derive(Error, Debug)]
pub enum SwipeError {

    // =============================
    // Remote Service Errors
    // =============================

    #[error("Network error: {0}")]
    Network(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("API returned {status}: {body}")]
    Api { status: u16, body: String },

    // =============================
    // Session Errors
    // =============================

    #[error("Precondition violation: {0}")]
    PreconditionViolation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl SwipeError {
    /// Message shown on the load error panel.
    pub fn load_message(&self) -> String {
        match self {
            SwipeError::Decode(msg) => format!("Could not read transactions: {}", msg),
            SwipeError::Network(msg) => format!("Could not reach the server: {}", msg),
            SwipeError::Api { status, .. } => format!("Server responded with status {}", status),
            other => other.to_string(),
        }
    }
}
