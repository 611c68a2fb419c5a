//! Error types for Shelfscope

use thiserror::Error;

/// Core error type for Shelfscope operations
#[derive(Error, Debug)]
pub enum ShelfscopeError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl ShelfscopeError {
    /// Whether the error came from the remote backend rather than local state
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Http { .. } | Self::InvalidResponse(_)
        )
    }
}

/// Result type alias for Shelfscope operations
pub type Result<T> = std::result::Result<T, ShelfscopeError>;
