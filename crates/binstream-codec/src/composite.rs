//! Codecs built from component codecs: arrays, collections, maps and enums.
//!
//! None of these write type tags. The element, key and value layouts come
//! from the descriptor the codec was resolved for.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use binstream_buffer::{Sink, Source};
use indexmap::{IndexMap, IndexSet};

use crate::codec::{get_len, put_len, Codec, SharedCodec};
use crate::error::{CodecError, Result};
use crate::types::{CollectionKind, Container, EnumType, MapKind};
use crate::value::{EnumConstant, Value};

// Counts come off the wire, so preallocation is capped.
const MAX_PREALLOC: usize = 4096;

fn write_elements(
    element: &dyn Codec,
    expected: &str,
    value: &Value,
    sink: &mut dyn Sink,
) -> Result<()> {
    match value {
        Value::Array(items) | Value::List(items) => write_all(element, items.len(), items, sink),
        Value::Set(items) => write_all(element, items.len(), items, sink),
        Value::SortedSet(items) => write_all(element, items.len(), items, sink),
        other => Err(CodecError::mismatch(expected, other.type_name())),
    }
}

fn write_all<'a>(
    element: &dyn Codec,
    len: usize,
    items: impl IntoIterator<Item = &'a Value>,
    sink: &mut dyn Sink,
) -> Result<()> {
    put_len(sink, len)?;
    for item in items {
        element.encode(item, sink)?;
    }
    Ok(())
}

fn read_elements(element: &dyn Codec, source: &mut dyn Source) -> Result<Vec<Value>> {
    let len = get_len(source)?;
    let mut items = Vec::with_capacity(len.min(MAX_PREALLOC));
    for _ in 0..len {
        items.push(element.decode(source)?);
    }
    Ok(items)
}

/// Fixed-length sequence: 4-byte count, then the elements.
#[derive(Debug)]
pub struct ArrayCodec {
    element: SharedCodec,
}

impl ArrayCodec {
    pub fn new(element: SharedCodec) -> Self {
        Self { element }
    }
}

impl Codec for ArrayCodec {
    fn encode(&self, value: &Value, sink: &mut dyn Sink) -> Result<()> {
        write_elements(self.element.as_ref(), "array", value, sink)
    }

    fn decode(&self, source: &mut dyn Source) -> Result<Value> {
        read_elements(self.element.as_ref(), source).map(Value::Array)
    }
}

/// Collection of any kind: 4-byte count, then the elements in iteration order.
#[derive(Debug)]
pub struct CollectionCodec {
    kind: CollectionKind,
    element: SharedCodec,
}

impl CollectionCodec {
    pub fn new(kind: CollectionKind, element: SharedCodec) -> Self {
        Self { kind, element }
    }

    pub fn kind(&self) -> CollectionKind {
        self.kind
    }
}

impl Codec for CollectionCodec {
    fn encode(&self, value: &Value, sink: &mut dyn Sink) -> Result<()> {
        write_elements(self.element.as_ref(), self.kind.as_str(), value, sink)
    }

    fn decode(&self, source: &mut dyn Source) -> Result<Value> {
        let items = read_elements(self.element.as_ref(), source)?;
        let value = match self.kind.container() {
            Container::Sequence => Value::List(items),
            Container::InsertionSet => Value::Set(items.into_iter().collect::<IndexSet<_>>()),
            Container::SortedSet => Value::SortedSet(items.into_iter().collect::<BTreeSet<_>>()),
        };
        Ok(value)
    }
}

/// Map of any kind: 4-byte entry count, then key/value pairs.
#[derive(Debug)]
pub struct MapCodec {
    kind: MapKind,
    key: SharedCodec,
    value: SharedCodec,
}

impl MapCodec {
    pub fn new(kind: MapKind, key: SharedCodec, value: SharedCodec) -> Self {
        Self { kind, key, value }
    }

    fn write_entries<'a>(
        &self,
        len: usize,
        entries: impl IntoIterator<Item = (&'a Value, &'a Value)>,
        sink: &mut dyn Sink,
    ) -> Result<()> {
        put_len(sink, len)?;
        for (k, v) in entries {
            self.key.encode(k, sink)?;
            self.value.encode(v, sink)?;
        }
        Ok(())
    }
}

impl Codec for MapCodec {
    fn encode(&self, value: &Value, sink: &mut dyn Sink) -> Result<()> {
        match value {
            Value::Map(entries) => self.write_entries(entries.len(), entries, sink),
            Value::SortedMap(entries) => self.write_entries(entries.len(), entries, sink),
            other => Err(CodecError::mismatch(self.kind.as_str(), other.type_name())),
        }
    }

    fn decode(&self, source: &mut dyn Source) -> Result<Value> {
        let len = get_len(source)?;
        if self.kind.is_sorted() {
            let mut entries = BTreeMap::new();
            for _ in 0..len {
                let k = self.key.decode(source)?;
                let v = self.value.decode(source)?;
                entries.insert(k, v);
            }
            Ok(Value::SortedMap(entries))
        } else {
            let mut entries = IndexMap::with_capacity(len.min(MAX_PREALLOC));
            for _ in 0..len {
                let k = self.key.decode(source)?;
                let v = self.value.decode(source)?;
                entries.insert(k, v);
            }
            Ok(Value::Map(entries))
        }
    }
}

/// Enum constant written as its 4-byte ordinal.
#[derive(Debug)]
pub struct EnumCodec {
    ty: Arc<EnumType>,
}

impl EnumCodec {
    pub fn new(ty: Arc<EnumType>) -> Self {
        Self { ty }
    }
}

impl Codec for EnumCodec {
    fn encode(&self, value: &Value, sink: &mut dyn Sink) -> Result<()> {
        let Value::Enum(constant) = value else {
            return Err(CodecError::mismatch(&self.ty.name, value.type_name()));
        };

        let index = constant.ordinal as usize;
        if self.ty.constant(index) != Some(constant.name.as_str()) {
            return Err(CodecError::Index {
                type_name: self.ty.name.clone(),
                ordinal: i64::from(constant.ordinal),
                len: self.ty.constants.len(),
            });
        }
        put_len(sink, index)
    }

    fn decode(&self, source: &mut dyn Source) -> Result<Value> {
        let ordinal = source.get_i32()?;
        let name = usize::try_from(ordinal)
            .ok()
            .and_then(|index| self.ty.constant(index));

        match name {
            Some(name) => Ok(Value::Enum(EnumConstant::new(ordinal as u32, name))),
            None => Err(CodecError::Index {
                type_name: self.ty.name.clone(),
                ordinal: i64::from(ordinal),
                len: self.ty.constants.len(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::{Bytes, BytesMut};

    use super::*;
    use crate::codec::{IntCodec, StringCodec};

    fn int() -> SharedCodec {
        Arc::new(IntCodec)
    }

    fn string() -> SharedCodec {
        Arc::new(StringCodec)
    }

    fn round_trip(codec: &dyn Codec, value: &Value) -> (Vec<u8>, Value) {
        let mut out = BytesMut::new();
        codec.encode(value, &mut out).unwrap();
        let wire = out.to_vec();
        let mut src = Bytes::from(wire.clone());
        let decoded = codec.decode(&mut src).unwrap();
        assert!(src.is_empty(), "trailing bytes after decode");
        (wire, decoded)
    }

    fn ints(values: &[i32]) -> Vec<Value> {
        values.iter().copied().map(Value::Int).collect()
    }

    #[test]
    fn array_layout() {
        let codec = ArrayCodec::new(int());
        let (wire, decoded) = round_trip(&codec, &Value::Array(ints(&[1, 2])));
        assert_eq!(wire, vec![0, 0, 0, 2, 0, 0, 0, 1, 0, 0, 0, 2]);
        assert_eq!(decoded, Value::Array(ints(&[1, 2])));
    }

    #[test]
    fn collection_kinds_pick_their_container() {
        let input = Value::List(ints(&[3, 1, 2, 1]));

        let list = CollectionCodec::new(CollectionKind::Queue, int());
        assert_eq!(round_trip(&list, &input).1, input);

        let set = CollectionCodec::new(CollectionKind::Set, int());
        let Value::Set(decoded) = round_trip(&set, &input).1 else {
            panic!("expected insertion-ordered set");
        };
        assert_eq!(decoded.into_iter().collect::<Vec<_>>(), ints(&[3, 1, 2]));

        let sorted = CollectionCodec::new(CollectionKind::SortedSet, int());
        let Value::SortedSet(decoded) = round_trip(&sorted, &input).1 else {
            panic!("expected sorted set");
        };
        assert_eq!(decoded.into_iter().collect::<Vec<_>>(), ints(&[1, 2, 3]));
    }

    #[test]
    fn collections_accept_any_sequence_shape() {
        let codec = CollectionCodec::new(CollectionKind::List, int());
        let set: BTreeSet<Value> = ints(&[5, 4]).into_iter().collect();
        let (_, decoded) = round_trip(&codec, &Value::SortedSet(set));
        assert_eq!(decoded, Value::List(ints(&[4, 5])));
    }

    #[test]
    fn empty_collection_is_just_a_count() {
        let codec = CollectionCodec::new(CollectionKind::List, string());
        let (wire, decoded) = round_trip(&codec, &Value::List(Vec::new()));
        assert_eq!(wire, vec![0, 0, 0, 0]);
        assert_eq!(decoded, Value::List(Vec::new()));
    }

    #[test]
    fn map_preserves_insertion_order() {
        let mut entries = IndexMap::new();
        entries.insert(Value::from("b"), Value::Int(2));
        entries.insert(Value::from("a"), Value::Int(1));
        let codec = MapCodec::new(MapKind::Map, string(), int());

        let Value::Map(decoded) = round_trip(&codec, &Value::Map(entries)).1 else {
            panic!("expected map");
        };
        let keys: Vec<&str> = decoded.keys().filter_map(Value::as_str).collect();
        assert_eq!(keys, vec!["b", "a"]);
    }

    #[test]
    fn sorted_map_orders_keys() {
        let mut entries = IndexMap::new();
        entries.insert(Value::Int(9), Value::from("nine"));
        entries.insert(Value::Int(3), Value::from("three"));
        let codec = MapCodec::new(MapKind::SortedMap, int(), string());

        let Value::SortedMap(decoded) = round_trip(&codec, &Value::Map(entries)).1 else {
            panic!("expected sorted map");
        };
        assert_eq!(decoded.keys().cloned().collect::<Vec<_>>(), ints(&[3, 9]));
    }

    #[test]
    fn map_rejects_sequences() {
        let codec = MapCodec::new(MapKind::Map, int(), int());
        let err = codec
            .encode(&Value::List(Vec::new()), &mut BytesMut::new())
            .unwrap_err();
        assert!(matches!(err, CodecError::Mismatch { found: "list", .. }));
    }

    fn month() -> EnumCodec {
        EnumCodec::new(Arc::new(EnumType::new(
            "Month",
            ["JANUARY", "FEBRUARY", "MARCH"],
        )))
    }

    #[test]
    fn enum_writes_ordinal() {
        let (wire, decoded) = round_trip(&month(), &Value::Enum(EnumConstant::new(2, "MARCH")));
        assert_eq!(wire, vec![0, 0, 0, 2]);
        assert_eq!(decoded, Value::Enum(EnumConstant::new(2, "MARCH")));
    }

    #[test]
    fn enum_ordinal_out_of_range() {
        for wire in [[0, 0, 0, 3], [0xFF, 0xFF, 0xFF, 0xFF]] {
            let mut src = Bytes::copy_from_slice(&wire);
            let err = month().decode(&mut src).unwrap_err();
            assert!(matches!(
                err,
                CodecError::Index { ref type_name, len: 3, .. } if type_name == "Month"
            ));
        }
    }

    #[test]
    fn enum_rejects_foreign_constant() {
        let err = month()
            .encode(
                &Value::Enum(EnumConstant::new(0, "SMARCH")),
                &mut BytesMut::new(),
            )
            .unwrap_err();
        assert!(matches!(err, CodecError::Index { ordinal: 0, .. }));
    }
}
