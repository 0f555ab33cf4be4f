//! Error types for the widget sync engine.

/// Top-level error type for the widget sync engine.
#[derive(Debug, thiserror::Error)]
pub enum GlanceError {
    /// Key-value store read/write error.
    #[error("store error: {0}")]
    Store(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Channel send/receive error.
    #[error("channel error: {0}")]
    Channel(String),

    /// Host command contract violation (bad envelope, bad payload).
    #[error("contract error: {0}")]
    Contract(String),

    /// List content could not be encoded or decoded.
    #[error("content error: {0}")]
    Content(String),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, GlanceError>;
