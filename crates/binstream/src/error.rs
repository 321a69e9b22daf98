use binstream_buffer::BufferError;
use binstream_codec::CodecError;

/// Errors that can occur while reading or writing a value stream.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// Codec resolution or value encoding/decoding failed.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The channel or its buffer failed.
    #[error(transparent)]
    Buffer(#[from] BufferError),

    /// A value was requested after the end of the stream.
    #[error("stream exhausted")]
    Exhausted,
}

pub type Result<T> = std::result::Result<T, StreamError>;
