//! Typed binary value streams over files.
//!
//! binstream writes sequences of values to a file and reads them back using
//! a codec chosen by a [`Type`] descriptor. The wire format is compact and
//! carries no tags, so both sides must agree on the descriptor.
//!
//! # Crate Structure
//!
//! - [`buffer`]: fixed-capacity chunk buffers and big-endian primitives
//! - [`codec`]: value model, type descriptors, codecs and the registry
//! - [`StreamFactory`]: opens [`StreamReader`]s and [`StreamWriter`]s
//!
//! ```no_run
//! use binstream::{StreamFactory, Type, Value};
//!
//! let factory = StreamFactory::new();
//! let ty: Type = "list<string>".parse()?;
//! factory.write_values("words.bin", &ty, [Value::List(vec!["hi".into()])])?;
//! let values = factory.read_values("words.bin", &ty)?;
//! assert_eq!(values.len(), 1);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

/// Re-export buffer types.
pub mod buffer {
    pub use binstream_buffer::*;
}

/// Re-export codec types.
pub mod codec {
    pub use binstream_codec::*;
}

mod error;
mod factory;
mod stream;

pub use binstream_codec::{
    wire_enum, wire_record, Codec, CodecRegistry, EnumConstant, RecordType, RecordValue, Type,
    Value, WireType,
};
pub use error::{Result, StreamError};
pub use factory::{StreamConfig, StreamFactory, TypedReader};
pub use stream::{StreamReader, StreamWriter};
