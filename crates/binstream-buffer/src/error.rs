use std::path::PathBuf;

/// Errors that can occur while moving bytes between a buffer and its channel.
#[derive(Debug, thiserror::Error)]
pub enum BufferError {
    /// The channel could not be opened.
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The channel ran dry before a requested value was complete.
    #[error("buffer underflow ({needed} bytes needed, {available} available)")]
    Underflow { needed: usize, available: usize },

    /// An I/O error occurred on the channel.
    #[error("channel I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The channel accepted zero bytes on write.
    #[error("channel closed")]
    Closed,

    /// The requested capacity cannot hold the widest primitive.
    #[error("buffer capacity too small ({capacity} bytes, min {min})")]
    Capacity { capacity: usize, min: usize },
}

pub type Result<T> = std::result::Result<T, BufferError>;
