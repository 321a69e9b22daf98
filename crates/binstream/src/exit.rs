use std::fmt;
use std::io;

use binstream::buffer::BufferError;
use binstream::codec::CodecError;
use binstream::StreamError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::NotFound => FAILURE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn buffer_error(context: &str, err: BufferError) -> CliError {
    match err {
        BufferError::Open { source, .. } | BufferError::Io(source) => io_error(context, source),
        BufferError::Underflow { .. } => CliError::new(DATA_INVALID, format!("{context}: {err}")),
        BufferError::Capacity { .. } => CliError::new(USAGE, format!("{context}: {err}")),
        BufferError::Closed => CliError::new(FAILURE, format!("{context}: {err}")),
    }
}

pub fn codec_error(context: &str, err: CodecError) -> CliError {
    match err {
        CodecError::Buffer(err) => buffer_error(context, err),
        CodecError::UnsupportedType(_)
        | CodecError::CyclicSchema(_)
        | CodecError::TypeSyntax { .. }
        | CodecError::Declaration(_) => CliError::new(USAGE, format!("{context}: {err}")),
        CodecError::Index { .. }
        | CodecError::Mismatch { .. }
        | CodecError::InvalidUtf8(_)
        | CodecError::NegativeLength(_)
        | CodecError::LengthOverflow(_)
        | CodecError::Instantiation { .. }
        | CodecError::Json(_) => CliError::new(DATA_INVALID, format!("{context}: {err}")),
    }
}

pub fn stream_error(context: &str, err: StreamError) -> CliError {
    match err {
        StreamError::Codec(err) => codec_error(context, err),
        StreamError::Buffer(err) => buffer_error(context, err),
        StreamError::Exhausted => CliError::new(INTERNAL, format!("{context}: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_io_kinds() {
        let denied = io::Error::new(io::ErrorKind::PermissionDenied, "nope");
        assert_eq!(io_error("open", denied).code, PERMISSION_DENIED);
        let missing = io::Error::new(io::ErrorKind::NotFound, "gone");
        assert_eq!(io_error("open", missing).code, FAILURE);
    }

    #[test]
    fn truncated_streams_are_invalid_data() {
        let err = StreamError::Codec(CodecError::Buffer(BufferError::Underflow {
            needed: 4,
            available: 1,
        }));
        let err = stream_error("decode failed", err);
        assert_eq!(err.code, DATA_INVALID);
        assert!(err.message.starts_with("decode failed: "));
    }

    #[test]
    fn unknown_types_are_usage_errors() {
        let err = codec_error("open", CodecError::UnsupportedType("Person".into()));
        assert_eq!(err.code, USAGE);
    }
}
