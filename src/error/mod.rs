//! Error types for genai-live.

use thiserror::Error;

/// Primary error type for all live-session operations.
#[derive(Error, Debug)]
pub enum LiveError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Connect config has not been set")]
    ConfigNotSet,

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Not connected")]
    NotConnected,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Base64 decode error: {0}")]
    Decode(#[from] base64::DecodeError),
}

/// Broad error category for routing handling logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The caller broke a precondition; nothing was attempted.
    Usage,
    Authentication,
    Network,
    Protocol,
    Unknown,
}

impl LiveError {
    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Configuration(_) | Self::InvalidArgument(_) | Self::ConfigNotSet => {
                ErrorCategory::Usage
            }
            Self::Authentication(_) => ErrorCategory::Authentication,
            Self::Connection(_) | Self::Transport(_) | Self::NotConnected | Self::Io(_) => {
                ErrorCategory::Network
            }
            Self::Serialization(_) | Self::Decode(_) => ErrorCategory::Protocol,
        }
    }

    /// Whether the caller misused the API (as opposed to a runtime failure).
    pub fn is_usage_error(&self) -> bool {
        self.category() == ErrorCategory::Usage
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, LiveError>;
