use binstream_buffer::BufferError;

/// Errors that can occur while resolving codecs or moving values across the wire.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// No codec is registered or derivable for the type.
    #[error("unsupported type: {0}")]
    UnsupportedType(String),

    /// An enum ordinal on the wire is outside the declared constants.
    #[error("ordinal {ordinal} out of range for enum {type_name} ({len} constants)")]
    Index {
        type_name: String,
        ordinal: i64,
        len: usize,
    },

    /// A record value could not be built or does not fit its declaration.
    #[error("cannot instantiate {type_name}: {message}")]
    Instantiation { type_name: String, message: String },

    /// Record declarations reference each other in a loop.
    #[error("cyclic record schema: {0}")]
    CyclicSchema(String),

    /// A value does not have the shape its codec expects.
    #[error("type mismatch (expected {expected}, found {found})")]
    Mismatch { expected: String, found: &'static str },

    /// A string on the wire is not valid UTF-8.
    #[error("invalid UTF-8 in string: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// A length or count prefix on the wire is negative.
    #[error("negative length prefix: {0}")]
    NegativeLength(i32),

    /// A length or count does not fit the 4-byte prefix.
    #[error("length {0} exceeds the 4-byte prefix range")]
    LengthOverflow(usize),

    /// A type expression could not be parsed.
    #[error("invalid type expression {input:?}: {message}")]
    TypeSyntax { input: String, message: String },

    /// A declaration could not be loaded or registered.
    #[error("failed to load declarations: {0}")]
    Declaration(String),

    /// JSON input could not be parsed.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The underlying buffer failed.
    #[error(transparent)]
    Buffer(#[from] BufferError),
}

impl CodecError {
    pub(crate) fn mismatch(expected: impl ToString, found: &'static str) -> Self {
        Self::Mismatch {
            expected: expected.to_string(),
            found,
        }
    }

    pub(crate) fn instantiation(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Instantiation {
            type_name: type_name.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CodecError>;
