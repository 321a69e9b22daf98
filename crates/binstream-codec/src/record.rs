//! Structural codec for declared record types.
//!
//! Wire layout: a null bitmap of `ceil(nullable / 8)` bytes, then every
//! present field in declaration order. Bit `k` (byte `k / 8`, mask
//! `1 << (k % 8)`) belongs to the `k`-th nullable field and is set when that
//! field is absent. Absent fields occupy no bytes.

use std::collections::HashSet;
use std::sync::Arc;

use binstream_buffer::{Sink, Source};

use crate::codec::{Codec, SharedCodec};
use crate::error::{CodecError, Result};
use crate::types::RecordType;
use crate::value::{RecordValue, Value};

#[derive(Debug)]
struct FieldCodec {
    name: String,
    /// Bitmap slot, for nullable fields only.
    slot: Option<usize>,
    codec: SharedCodec,
}

/// Codec derived from a [`RecordType`] and one resolved codec per field.
#[derive(Debug)]
pub struct RecordCodec {
    ty: Arc<RecordType>,
    fields: Vec<FieldCodec>,
    nullable_bytes: usize,
}

impl RecordCodec {
    /// Pair each declared field with its codec, in declaration order.
    pub fn new(ty: Arc<RecordType>, codecs: Vec<SharedCodec>) -> Result<Self> {
        if codecs.len() != ty.fields.len() {
            return Err(CodecError::instantiation(
                &ty.name,
                format!(
                    "{} fields declared but {} codecs supplied",
                    ty.fields.len(),
                    codecs.len()
                ),
            ));
        }

        let mut seen = HashSet::new();
        let mut nullable = 0usize;
        let mut fields = Vec::with_capacity(codecs.len());
        for (def, codec) in ty.fields.iter().zip(codecs) {
            if !seen.insert(def.name.as_str()) {
                return Err(CodecError::instantiation(
                    &ty.name,
                    format!("duplicate field {}", def.name),
                ));
            }
            let slot = def.is_nullable().then(|| {
                nullable += 1;
                nullable - 1
            });
            fields.push(FieldCodec {
                name: def.name.clone(),
                slot,
                codec,
            });
        }

        Ok(Self {
            ty,
            fields,
            nullable_bytes: nullable.div_ceil(8),
        })
    }

    pub fn record_type(&self) -> &Arc<RecordType> {
        &self.ty
    }

    /// Width of the null bitmap in bytes.
    pub fn nullable_bytes(&self) -> usize {
        self.nullable_bytes
    }

    fn check_shape(&self, record: &RecordValue) -> Result<()> {
        if record.name() != self.ty.name {
            return Err(CodecError::instantiation(
                &self.ty.name,
                format!("value is a {} record", record.name()),
            ));
        }
        for (name, _) in record.fields() {
            if !self.fields.iter().any(|f| f.name == name) {
                return Err(CodecError::instantiation(
                    &self.ty.name,
                    format!("unknown field {name}"),
                ));
            }
        }
        Ok(())
    }
}

impl Codec for RecordCodec {
    fn encode(&self, value: &Value, sink: &mut dyn Sink) -> Result<()> {
        let Value::Record(record) = value else {
            return Err(CodecError::mismatch(&self.ty.name, value.type_name()));
        };
        self.check_shape(record)?;

        let mut bitmap = vec![0u8; self.nullable_bytes];
        let mut present = Vec::with_capacity(self.fields.len());
        for field in &self.fields {
            let value = record.get(&field.name).filter(|v| !v.is_null());
            match (value, field.slot) {
                (Some(value), _) => present.push((field, value)),
                (None, Some(slot)) => bitmap[slot / 8] |= 1 << (slot % 8),
                (None, None) => {
                    return Err(CodecError::instantiation(
                        &self.ty.name,
                        format!("field {} is not nullable", field.name),
                    ));
                }
            }
        }

        sink.put_bytes(&bitmap)?;
        for (field, value) in present {
            field.codec.encode(value, sink)?;
        }
        Ok(())
    }

    fn decode(&self, source: &mut dyn Source) -> Result<Value> {
        let bitmap = source.get_bytes(self.nullable_bytes)?;

        let mut record = RecordValue::new(self.ty.name.clone());
        for field in &self.fields {
            let absent = field
                .slot
                .is_some_and(|slot| bitmap[slot / 8] & (1 << (slot % 8)) != 0);
            let value = if absent {
                Value::Null
            } else {
                field.codec.decode(source)?
            };
            record.set(field.name.clone(), value);
        }
        Ok(Value::Record(record))
    }
}

#[cfg(test)]
mod tests {
    use bytes::{Bytes, BytesMut};

    use super::*;
    use crate::codec::primitive_codec;
    use crate::types::Type;

    fn derive(ty: RecordType) -> RecordCodec {
        let codecs = ty
            .fields
            .iter()
            .map(|f| primitive_codec(&f.ty).unwrap())
            .collect();
        RecordCodec::new(Arc::new(ty), codecs).unwrap()
    }

    fn person() -> RecordCodec {
        derive(
            RecordType::builder("Person")
                .field("age", Type::Int)
                .field("nick", Type::String)
                .optional("score", Type::Long)
                .build(),
        )
    }

    fn encode(codec: &RecordCodec, value: &Value) -> Vec<u8> {
        let mut out = BytesMut::new();
        codec.encode(value, &mut out).unwrap();
        out.to_vec()
    }

    fn decode(codec: &RecordCodec, wire: Vec<u8>) -> Value {
        let mut src = Bytes::from(wire);
        codec.decode(&mut src).unwrap()
    }

    #[test]
    fn absent_fields_take_no_space() {
        let codec = person();
        let value = Value::Record(RecordValue::new("Person").with("age", 7i32));

        let wire = encode(&codec, &value);
        // bitmap: nick (bit 0) and score (bit 1) absent
        assert_eq!(wire, vec![0b0000_0011, 0, 0, 0, 7]);

        let decoded = decode(&codec, wire);
        let expected = RecordValue::new("Person")
            .with("age", 7i32)
            .with("nick", Value::Null)
            .with("score", Value::Null);
        assert_eq!(decoded, Value::Record(expected));
    }

    #[test]
    fn present_fields_follow_bitmap_in_order() {
        let codec = person();
        let value = Value::Record(
            RecordValue::new("Person")
                .with("nick", "al")
                .with("age", 30i32)
                .with("score", 5i64),
        );

        let wire = encode(&codec, &value);
        assert_eq!(
            wire,
            vec![0, 0, 0, 0, 30, 0, 0, 0, 2, b'a', b'l', 0, 0, 0, 0, 0, 0, 0, 5]
        );
        assert_eq!(decode(&codec, wire), value);
    }

    #[test]
    fn bitmap_width_counts_nullable_fields_only() {
        let cases = [(0, 3, 0), (1, 0, 1), (8, 5, 1), (9, 0, 2), (17, 2, 3)];
        for (nullable, primitives, bytes) in cases {
            let mut builder = RecordType::builder("Wide");
            for i in 0..primitives {
                builder = builder.field(format!("p{i}"), Type::Int);
            }
            for i in 0..nullable {
                builder = builder.field(format!("s{i}"), Type::String);
            }
            assert_eq!(derive(builder.build()).nullable_bytes(), bytes);
        }
    }

    #[test]
    fn ninth_nullable_field_lands_in_second_byte() {
        let mut builder = RecordType::builder("Wide").field("id", Type::Int);
        for i in 0..9 {
            builder = builder.field(format!("s{i}"), Type::String);
        }
        let codec = derive(builder.build());

        let mut record = RecordValue::new("Wide").with("id", 1i32);
        for i in 0..8 {
            record.set(format!("s{i}"), "x");
        }
        let wire = encode(&codec, &Value::Record(record));
        assert_eq!(&wire[..2], &[0x00, 0x01]);
    }

    #[test]
    fn missing_primitive_is_rejected() {
        let codec = person();
        let value = Value::Record(RecordValue::new("Person").with("nick", "x"));
        let err = codec.encode(&value, &mut BytesMut::new()).unwrap_err();
        assert!(matches!(err, CodecError::Instantiation { .. }));
    }

    #[test]
    fn unknown_field_and_wrong_name_are_rejected() {
        let codec = person();
        let extra = RecordValue::new("Person").with("age", 1i32).with("height", 2i32);
        let renamed = RecordValue::new("Robot").with("age", 1i32);

        for value in [extra, renamed] {
            let err = codec
                .encode(&Value::Record(value), &mut BytesMut::new())
                .unwrap_err();
            assert!(matches!(err, CodecError::Instantiation { .. }));
        }
    }

    #[test]
    fn duplicate_field_names_fail_derivation() {
        let ty = RecordType::builder("Dup")
            .field("a", Type::Int)
            .field("a", Type::Int)
            .build();
        let codecs = vec![primitive_codec(&Type::Int).unwrap(); 2];
        let err = RecordCodec::new(Arc::new(ty), codecs).unwrap_err();
        assert!(matches!(err, CodecError::Instantiation { .. }));
    }

    #[test]
    fn empty_record_has_no_bytes() {
        let codec = derive(RecordType::builder("Unit").build());
        let wire = encode(&codec, &Value::Record(RecordValue::new("Unit")));
        assert!(wire.is_empty());
        assert_eq!(decode(&codec, wire), Value::Record(RecordValue::new("Unit")));
    }
}
