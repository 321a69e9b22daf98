use std::fmt::Debug;
use std::sync::Arc;

use binstream_buffer::{Sink, Source};
use ordered_float::OrderedFloat;

use crate::error::{CodecError, Result};
use crate::types::Type;
use crate::value::Value;

/// Paired encode/decode logic for exactly one type.
///
/// Codecs hold no per-stream state, so one instance can serve any number of
/// streams concurrently.
pub trait Codec: Send + Sync + Debug {
    fn encode(&self, value: &Value, sink: &mut dyn Sink) -> Result<()>;
    fn decode(&self, source: &mut dyn Source) -> Result<Value>;
}

/// A codec shared between the registry cache and composite codecs.
pub type SharedCodec = Arc<dyn Codec>;

/// Write a 4-byte length or count prefix.
pub(crate) fn put_len(sink: &mut dyn Sink, len: usize) -> Result<()> {
    let len = i32::try_from(len).map_err(|_| CodecError::LengthOverflow(len))?;
    sink.put_i32(len)?;
    Ok(())
}

/// Read a 4-byte length or count prefix.
pub(crate) fn get_len(source: &mut dyn Source) -> Result<usize> {
    let len = source.get_i32()?;
    usize::try_from(len).map_err(|_| CodecError::NegativeLength(len))
}

macro_rules! fixed_codec {
    ($name:ident, $variant:ident, $label:literal, $put:ident, $get:ident) => {
        fixed_codec!($name, $variant, $label, $put, $get, |v| v, |v| v);
    };
    ($name:ident, $variant:ident, $label:literal, $put:ident, $get:ident, $to:expr, $from:expr) => {
        #[doc = concat!("Codec for `", $label, "` values.")]
        #[derive(Debug, Default, Clone, Copy)]
        pub struct $name;

        impl Codec for $name {
            fn encode(&self, value: &Value, sink: &mut dyn Sink) -> Result<()> {
                match value {
                    Value::$variant(v) => Ok(sink.$put(($to)(*v))?),
                    other => Err(CodecError::mismatch($label, other.type_name())),
                }
            }

            fn decode(&self, source: &mut dyn Source) -> Result<Value> {
                Ok(Value::$variant(($from)(source.$get()?)))
            }
        }
    };
}

fixed_codec!(ByteCodec, Byte, "byte", put_i8, get_i8);
fixed_codec!(CharCodec, Char, "char", put_u16, get_u16);
fixed_codec!(ShortCodec, Short, "short", put_i16, get_i16);
fixed_codec!(IntCodec, Int, "int", put_i32, get_i32);
fixed_codec!(LongCodec, Long, "long", put_i64, get_i64);
fixed_codec!(
    FloatCodec,
    Float,
    "float",
    put_f32,
    get_f32,
    |v: OrderedFloat<f32>| v.0,
    OrderedFloat
);
fixed_codec!(
    DoubleCodec,
    Double,
    "double",
    put_f64,
    get_f64,
    |v: OrderedFloat<f64>| v.0,
    OrderedFloat
);

/// Codec for `boolean` values.
///
/// Decoding is lenient: only the byte `1` is true, every other byte is false.
#[derive(Debug, Default, Clone, Copy)]
pub struct BooleanCodec;

impl Codec for BooleanCodec {
    fn encode(&self, value: &Value, sink: &mut dyn Sink) -> Result<()> {
        match value {
            Value::Boolean(v) => Ok(sink.put_u8(u8::from(*v))?),
            other => Err(CodecError::mismatch("boolean", other.type_name())),
        }
    }

    fn decode(&self, source: &mut dyn Source) -> Result<Value> {
        Ok(Value::Boolean(source.get_u8()? == 1))
    }
}

/// Codec for `string` values: 4-byte UTF-8 byte length, then the bytes.
#[derive(Debug, Default, Clone, Copy)]
pub struct StringCodec;

impl Codec for StringCodec {
    fn encode(&self, value: &Value, sink: &mut dyn Sink) -> Result<()> {
        let Value::String(s) = value else {
            return Err(CodecError::mismatch("string", value.type_name()));
        };
        put_len(sink, s.len())?;
        sink.put_bytes(s.as_bytes())?;
        Ok(())
    }

    fn decode(&self, source: &mut dyn Source) -> Result<Value> {
        let len = get_len(source)?;
        let bytes = source.get_bytes(len)?;
        Ok(Value::String(String::from_utf8(bytes)?))
    }
}

/// The built-in codec for a primitive or string type, if `ty` is one.
pub fn primitive_codec(ty: &Type) -> Option<SharedCodec> {
    let codec: SharedCodec = match ty {
        Type::Byte => Arc::new(ByteCodec),
        Type::Boolean => Arc::new(BooleanCodec),
        Type::Char => Arc::new(CharCodec),
        Type::Short => Arc::new(ShortCodec),
        Type::Int => Arc::new(IntCodec),
        Type::Long => Arc::new(LongCodec),
        Type::Float => Arc::new(FloatCodec),
        Type::Double => Arc::new(DoubleCodec),
        Type::String => Arc::new(StringCodec),
        _ => return None,
    };
    Some(codec)
}

/// Every built-in primitive type, in wire-table order.
pub const PRIMITIVE_TYPES: [Type; 9] = [
    Type::Byte,
    Type::Boolean,
    Type::Char,
    Type::Short,
    Type::Int,
    Type::Long,
    Type::Float,
    Type::Double,
    Type::String,
];

#[cfg(test)]
mod tests {
    use bytes::{Bytes, BytesMut};

    use super::*;

    fn encode(codec: &dyn Codec, value: &Value) -> Vec<u8> {
        let mut out = BytesMut::new();
        codec.encode(value, &mut out).unwrap();
        out.to_vec()
    }

    fn decode(codec: &dyn Codec, wire: &[u8]) -> Value {
        let mut src = Bytes::copy_from_slice(wire);
        codec.decode(&mut src).unwrap()
    }

    #[test]
    fn primitives_round_trip() {
        let cases = [
            (Type::Byte, Value::Byte(i8::MIN)),
            (Type::Boolean, Value::Boolean(true)),
            (Type::Char, Value::Char(0x3042)),
            (Type::Short, Value::Short(20456)),
            (Type::Int, Value::Int(-20456)),
            (Type::Long, Value::Long(9_020_456_432_459_916_251)),
            (Type::Float, Value::from(3.25f32)),
            (Type::Double, Value::from(-1.0e300f64)),
            (Type::String, Value::from("héllo")),
        ];

        for (ty, value) in cases {
            let codec = primitive_codec(&ty).unwrap();
            let wire = encode(codec.as_ref(), &value);
            assert_eq!(decode(codec.as_ref(), &wire), value, "{ty}");
        }
    }

    #[test]
    fn fixed_width_layouts() {
        assert_eq!(encode(&CharCodec, &Value::Char(0x3042)), vec![0x30, 0x42]);
        assert_eq!(encode(&IntCodec, &Value::Int(20456)), vec![0, 0, 0x4F, 0xE8]);
        assert_eq!(encode(&BooleanCodec, &Value::Boolean(false)), vec![0]);
        assert_eq!(
            encode(&FloatCodec, &Value::from(1.0f32)),
            1.0f32.to_bits().to_be_bytes().to_vec()
        );
    }

    #[test]
    fn boolean_decoding_is_lenient() {
        assert_eq!(decode(&BooleanCodec, &[1]), Value::Boolean(true));
        assert_eq!(decode(&BooleanCodec, &[0]), Value::Boolean(false));
        assert_eq!(decode(&BooleanCodec, &[2]), Value::Boolean(false));
        assert_eq!(decode(&BooleanCodec, &[0xFF]), Value::Boolean(false));
    }

    #[test]
    fn string_is_length_prefixed_utf8() {
        let wire = encode(&StringCodec, &Value::from("é"));
        assert_eq!(wire, vec![0, 0, 0, 2, 0xC3, 0xA9]);
        assert_eq!(encode(&StringCodec, &Value::from("")), vec![0, 0, 0, 0]);
    }

    #[test]
    fn string_rejects_invalid_utf8() {
        let mut src = Bytes::from_static(&[0, 0, 0, 1, 0xFF]);
        let err = StringCodec.decode(&mut src).unwrap_err();
        assert!(matches!(err, CodecError::InvalidUtf8(_)));
    }

    #[test]
    fn string_rejects_negative_length() {
        let mut src = Bytes::from_static(&[0xFF, 0xFF, 0xFF, 0xFE]);
        let err = StringCodec.decode(&mut src).unwrap_err();
        assert!(matches!(err, CodecError::NegativeLength(-2)));
    }

    #[test]
    fn truncated_input_surfaces_buffer_error() {
        let mut src = Bytes::from_static(&[0, 0, 0, 4, b'a']);
        let err = StringCodec.decode(&mut src).unwrap_err();
        assert!(matches!(err, CodecError::Buffer(_)));
    }

    #[test]
    fn wrong_value_shape_is_a_mismatch() {
        let mut out = BytesMut::new();
        let err = IntCodec.encode(&Value::from("7"), &mut out).unwrap_err();
        assert!(matches!(
            err,
            CodecError::Mismatch { ref expected, found: "string" } if expected == "int"
        ));
        assert!(out.is_empty());
    }

    #[test]
    fn only_primitive_types_have_builtin_codecs() {
        for ty in PRIMITIVE_TYPES {
            assert!(primitive_codec(&ty).is_some());
        }
        assert!(primitive_codec(&Type::list(Type::Int)).is_none());
    }
}
