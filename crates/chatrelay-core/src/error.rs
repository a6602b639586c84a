//! Error types for chatrelay

/// Result type alias using chatrelay's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for chatrelay operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Upstream run failure, cancellation, or expiry
    #[error("upstream error: {0}")]
    Upstream(String),

    /// Wire-format decode errors
    #[error("decode error: {0}")]
    Decode(String),

    /// Stream delivery errors (consumer gone, channel closed)
    #[error("stream error: {0}")]
    Stream(String),

    /// Storage errors
    #[error("store error: {0}")]
    Store(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Network/IO errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic internal errors
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new upstream error
    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::Upstream(msg.into())
    }

    /// Create a new decode error
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Create a new stream error
    pub fn stream(msg: impl Into<String>) -> Self {
        Self::Stream(msg.into())
    }

    /// Create a new store error
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
