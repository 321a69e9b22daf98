//! Type-directed codecs for binstream values.
//!
//! A [`CodecRegistry`] maps [`Type`] descriptors to [`Codec`]s. Primitive
//! codecs are built in; arrays, collections, maps and enums are composed on
//! demand; declared records get a structurally derived codec that writes a
//! null bitmap followed by the present fields.
//!
//! The wire format carries no type tags, headers or versions. Reader and
//! writer must agree on the descriptor.

pub mod codec;
pub mod composite;
pub mod config;
pub mod declarations;
pub mod error;
pub mod json;
pub mod record;
pub mod registry;
pub mod typed;
pub mod types;
pub mod value;

pub use codec::{
    primitive_codec, BooleanCodec, ByteCodec, CharCodec, Codec, DoubleCodec, FloatCodec, IntCodec,
    LongCodec, SharedCodec, ShortCodec, StringCodec, PRIMITIVE_TYPES,
};
pub use composite::{ArrayCodec, CollectionCodec, EnumCodec, MapCodec};
pub use config::RegistryConfig;
pub use declarations::DeclarationFile;
pub use error::{CodecError, Result};
pub use record::RecordCodec;
pub use registry::CodecRegistry;
pub use typed::WireType;
pub use types::{
    CollectionKind, Container, EnumType, FieldDef, MapKind, RecordType, RecordTypeBuilder, Type,
};
pub use value::{EnumConstant, RecordValue, Value};
