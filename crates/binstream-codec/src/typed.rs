//! Static Rust types mapped onto wire types.
//!
//! [`WireType`] ties a Rust type to its [`Type`] descriptor and converts
//! between it and [`Value`]. Records and enums are declared with
//! [`wire_record!`](crate::wire_record) and [`wire_enum!`](crate::wire_enum).

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::hash::Hash;

use indexmap::{IndexMap, IndexSet};
use ordered_float::OrderedFloat;

use crate::error::{CodecError, Result};
use crate::types::{CollectionKind, MapKind, Type};
use crate::value::{EnumConstant, RecordValue, Value};

/// A Rust type with a fixed wire layout.
pub trait WireType: Sized {
    /// Descriptor for this type's wire layout.
    fn wire_type() -> Type;

    fn to_value(&self) -> Result<Value>;

    fn from_value(value: Value) -> Result<Self>;

    /// Whether a record field of this type may be absent.
    fn nullable() -> bool {
        false
    }
}

macro_rules! primitive_wire_type {
    ($($ty:ty => $variant:ident, $wire:expr;)*) => {
        $(
            impl WireType for $ty {
                fn wire_type() -> Type {
                    $wire
                }

                fn to_value(&self) -> Result<Value> {
                    Ok(Value::$variant((*self).into()))
                }

                fn from_value(value: Value) -> Result<Self> {
                    match value {
                        Value::$variant(v) => Ok(v.into()),
                        other => Err(CodecError::mismatch(Self::wire_type(), other.type_name())),
                    }
                }
            }
        )*
    };
}

primitive_wire_type! {
    i8 => Byte, Type::Byte;
    bool => Boolean, Type::Boolean;
    i16 => Short, Type::Short;
    i32 => Int, Type::Int;
    i64 => Long, Type::Long;
}

impl WireType for f32 {
    fn wire_type() -> Type {
        Type::Float
    }

    fn to_value(&self) -> Result<Value> {
        Ok(Value::Float(OrderedFloat(*self)))
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Float(v) => Ok(v.0),
            other => Err(CodecError::mismatch(Type::Float, other.type_name())),
        }
    }
}

impl WireType for f64 {
    fn wire_type() -> Type {
        Type::Double
    }

    fn to_value(&self) -> Result<Value> {
        Ok(Value::Double(OrderedFloat(*self)))
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Double(v) => Ok(v.0),
            other => Err(CodecError::mismatch(Type::Double, other.type_name())),
        }
    }
}

/// A `char` is one UTF-16 code unit on the wire, so only the Basic
/// Multilingual Plane is representable.
impl WireType for char {
    fn wire_type() -> Type {
        Type::Char
    }

    fn to_value(&self) -> Result<Value> {
        Value::from_char(*self)
            .ok_or_else(|| CodecError::mismatch("char in the basic multilingual plane", "char"))
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Char(unit) => char::from_u32(u32::from(unit))
                .ok_or_else(|| CodecError::mismatch("char", "unpaired surrogate")),
            other => Err(CodecError::mismatch(Type::Char, other.type_name())),
        }
    }
}

impl WireType for String {
    fn wire_type() -> Type {
        Type::String
    }

    fn to_value(&self) -> Result<Value> {
        Ok(Value::String(self.clone()))
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::String(s) => Ok(s),
            other => Err(CodecError::mismatch(Type::String, other.type_name())),
        }
    }
}

impl<T: WireType> WireType for Option<T> {
    fn wire_type() -> Type {
        T::wire_type()
    }

    fn to_value(&self) -> Result<Value> {
        match self {
            Some(v) => v.to_value(),
            None => Ok(Value::Null),
        }
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }

    fn nullable() -> bool {
        true
    }
}

fn sequence(value: Value, expected: Type) -> Result<Vec<Value>> {
    match value {
        Value::Array(items) | Value::List(items) => Ok(items),
        Value::Set(items) => Ok(items.into_iter().collect()),
        Value::SortedSet(items) => Ok(items.into_iter().collect()),
        other => Err(CodecError::mismatch(expected, other.type_name())),
    }
}

fn entries(value: Value, expected: Type) -> Result<Vec<(Value, Value)>> {
    match value {
        Value::Map(entries) => Ok(entries.into_iter().collect()),
        Value::SortedMap(entries) => Ok(entries.into_iter().collect()),
        other => Err(CodecError::mismatch(expected, other.type_name())),
    }
}

fn to_values<'a, T, C>(items: impl IntoIterator<Item = &'a T>) -> Result<C>
where
    T: WireType + 'a,
    C: FromIterator<Value>,
{
    items.into_iter().map(WireType::to_value).collect()
}

fn from_values<T, C>(value: Value, expected: Type) -> Result<C>
where
    T: WireType,
    C: FromIterator<T>,
{
    sequence(value, expected)?
        .into_iter()
        .map(T::from_value)
        .collect()
}

impl<T: WireType> WireType for Vec<T> {
    fn wire_type() -> Type {
        Type::list(T::wire_type())
    }

    fn to_value(&self) -> Result<Value> {
        to_values(self).map(Value::List)
    }

    fn from_value(value: Value) -> Result<Self> {
        from_values(value, Self::wire_type())
    }
}

impl<T: WireType> WireType for Box<[T]> {
    fn wire_type() -> Type {
        Type::array(T::wire_type())
    }

    fn to_value(&self) -> Result<Value> {
        to_values(self.iter()).map(Value::Array)
    }

    fn from_value(value: Value) -> Result<Self> {
        from_values(value, Self::wire_type())
    }
}

impl<T: WireType> WireType for VecDeque<T> {
    fn wire_type() -> Type {
        Type::collection(CollectionKind::Queue, T::wire_type())
    }

    fn to_value(&self) -> Result<Value> {
        to_values(self).map(Value::List)
    }

    fn from_value(value: Value) -> Result<Self> {
        from_values(value, Self::wire_type())
    }
}

impl<T: WireType + Ord> WireType for BTreeSet<T> {
    fn wire_type() -> Type {
        Type::collection(CollectionKind::SortedSet, T::wire_type())
    }

    fn to_value(&self) -> Result<Value> {
        to_values(self).map(Value::SortedSet)
    }

    fn from_value(value: Value) -> Result<Self> {
        from_values(value, Self::wire_type())
    }
}

impl<T: WireType + Hash + Eq> WireType for IndexSet<T> {
    fn wire_type() -> Type {
        Type::collection(CollectionKind::Set, T::wire_type())
    }

    fn to_value(&self) -> Result<Value> {
        to_values(self).map(Value::Set)
    }

    fn from_value(value: Value) -> Result<Self> {
        from_values(value, Self::wire_type())
    }
}

impl<K: WireType + Ord, V: WireType> WireType for BTreeMap<K, V> {
    fn wire_type() -> Type {
        Type::map(MapKind::SortedMap, K::wire_type(), V::wire_type())
    }

    fn to_value(&self) -> Result<Value> {
        self.iter()
            .map(|(k, v)| Ok((k.to_value()?, v.to_value()?)))
            .collect::<Result<_>>()
            .map(Value::SortedMap)
    }

    fn from_value(value: Value) -> Result<Self> {
        entries(value, Self::wire_type())?
            .into_iter()
            .map(|(k, v)| Ok((K::from_value(k)?, V::from_value(v)?)))
            .collect()
    }
}

impl<K: WireType + Hash + Eq, V: WireType> WireType for IndexMap<K, V> {
    fn wire_type() -> Type {
        Type::map(MapKind::Map, K::wire_type(), V::wire_type())
    }

    fn to_value(&self) -> Result<Value> {
        self.iter()
            .map(|(k, v)| Ok((k.to_value()?, v.to_value()?)))
            .collect::<Result<_>>()
            .map(Value::Map)
    }

    fn from_value(value: Value) -> Result<Self> {
        entries(value, Self::wire_type())?
            .into_iter()
            .map(|(k, v)| Ok((K::from_value(k)?, V::from_value(v)?)))
            .collect()
    }
}

#[doc(hidden)]
pub fn expect_record(value: Value, name: &str) -> Result<RecordValue> {
    match value {
        Value::Record(record) if record.name() == name => Ok(record),
        Value::Record(record) => Err(CodecError::instantiation(
            name,
            format!("value is a {} record", record.name()),
        )),
        other => Err(CodecError::mismatch(name, other.type_name())),
    }
}

#[doc(hidden)]
pub fn field_error(record: &str, field: &str, err: CodecError) -> CodecError {
    CodecError::instantiation(record, format!("field {field}: {err}"))
}

#[doc(hidden)]
pub fn unknown_field(record: &str, field: &str) -> CodecError {
    CodecError::instantiation(record, format!("unknown field {field}"))
}

#[doc(hidden)]
pub fn enum_value(type_name: &str, constants: &[&str], name: &str) -> Result<Value> {
    let ordinal = constants
        .iter()
        .position(|c| *c == name)
        .ok_or_else(|| CodecError::mismatch(format!("constant of {type_name}"), "enum"))?;
    let ordinal = u32::try_from(ordinal).map_err(|_| CodecError::LengthOverflow(ordinal))?;
    Ok(Value::Enum(EnumConstant::new(ordinal, name)))
}

#[doc(hidden)]
pub fn expect_enum(value: Value, type_name: &str, constants: &[&str]) -> Result<String> {
    match value {
        Value::Enum(constant) if constants.contains(&constant.name.as_str()) => Ok(constant.name),
        Value::Enum(constant) => Err(CodecError::Index {
            type_name: type_name.to_string(),
            ordinal: i64::from(constant.ordinal),
            len: constants.len(),
        }),
        other => Err(CodecError::mismatch(type_name, other.type_name())),
    }
}

/// Declare a struct whose fields map onto a wire record.
///
/// The struct must implement `Default`; decoding starts from the default
/// instance and assigns every field read off the wire. Field types must
/// implement [`WireType`]. A record may not contain itself, directly or
/// through collections.
///
/// ```
/// use binstream_codec::wire_record;
///
/// wire_record! {
///     #[derive(Debug, Default, PartialEq)]
///     pub struct Person {
///         pub age: i32,
///         pub nick: Option<String>,
///     }
/// }
/// ```
#[macro_export]
macro_rules! wire_record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                $field_vis:vis $field:ident : $field_ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $(
                $(#[$field_meta])*
                $field_vis $field: $field_ty,
            )*
        }

        impl $crate::WireType for $name {
            fn wire_type() -> $crate::Type {
                $crate::Type::record(
                    $crate::RecordType::builder(stringify!($name))
                        $(
                            .field_with(
                                stringify!($field),
                                <$field_ty as $crate::WireType>::wire_type(),
                                <$field_ty as $crate::WireType>::nullable(),
                            )
                        )*
                        .build(),
                )
            }

            fn to_value(&self) -> $crate::Result<$crate::Value> {
                let record = $crate::RecordValue::new(stringify!($name))
                    $(
                        .with(
                            stringify!($field),
                            $crate::WireType::to_value(&self.$field).map_err(|err| {
                                $crate::typed::field_error(stringify!($name), stringify!($field), err)
                            })?,
                        )
                    )*;
                Ok($crate::Value::Record(record))
            }

            #[allow(unused_mut)]
            fn from_value(value: $crate::Value) -> $crate::Result<Self> {
                let record = $crate::typed::expect_record(value, stringify!($name))?;
                let mut out = <Self as ::core::default::Default>::default();
                for (field, value) in record.into_fields() {
                    match field.as_str() {
                        $(
                            stringify!($field) => {
                                out.$field = <$field_ty as $crate::WireType>::from_value(value)
                                    .map_err(|err| {
                                        $crate::typed::field_error(
                                            stringify!($name),
                                            stringify!($field),
                                            err,
                                        )
                                    })?;
                            }
                        )*
                        other => {
                            return Err($crate::typed::unknown_field(stringify!($name), other));
                        }
                    }
                }
                Ok(out)
            }
        }
    };
}

/// Declare a fieldless enum whose variants map onto wire enum constants.
///
/// Ordinals follow declaration order.
///
/// ```
/// use binstream_codec::wire_enum;
///
/// wire_enum! {
///     #[derive(Debug, Clone, Copy, PartialEq, Eq)]
///     pub enum Month { January, February }
/// }
/// ```
#[macro_export]
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant,
            )+
        }

        impl $name {
            const WIRE_CONSTANTS: &'static [&'static str] = &[$(stringify!($variant)),+];
        }

        impl $crate::WireType for $name {
            fn wire_type() -> $crate::Type {
                $crate::Type::enumeration($crate::EnumType::new(
                    stringify!($name),
                    Self::WIRE_CONSTANTS.iter().copied(),
                ))
            }

            fn to_value(&self) -> $crate::Result<$crate::Value> {
                let name = match self {
                    $($name::$variant => stringify!($variant),)+
                };
                $crate::typed::enum_value(stringify!($name), Self::WIRE_CONSTANTS, name)
            }

            fn from_value(value: $crate::Value) -> $crate::Result<Self> {
                let name =
                    $crate::typed::expect_enum(value, stringify!($name), Self::WIRE_CONSTANTS)?;
                $(
                    if name == stringify!($variant) {
                        return Ok($name::$variant);
                    }
                )+
                Err($crate::typed::unknown_field(stringify!($name), &name))
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    crate::wire_enum! {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        enum Month {
            January,
            /// Second month.
            February,
            March,
        }
    }

    crate::wire_record! {
        #[derive(Debug, Default, PartialEq)]
        struct Person {
            age: i32,
            nick: Option<String>,
            score: Option<i64>,
            born: Option<Month>,
            tags: BTreeMap<String, i32>,
        }
    }

    #[test]
    fn primitive_descriptors() {
        assert_eq!(i8::wire_type(), Type::Byte);
        assert_eq!(char::wire_type(), Type::Char);
        assert_eq!(Option::<f64>::wire_type(), Type::Double);
        assert!(Option::<i32>::nullable());
        assert!(!i32::nullable());
    }

    #[test]
    fn container_descriptors() {
        assert_eq!(Vec::<i32>::wire_type().to_string(), "list<int>");
        assert_eq!(Box::<[String]>::wire_type().to_string(), "array<string>");
        assert_eq!(VecDeque::<bool>::wire_type().to_string(), "queue<boolean>");
        assert_eq!(BTreeSet::<i64>::wire_type().to_string(), "sorted_set<long>");
        assert_eq!(IndexSet::<i16>::wire_type().to_string(), "set<short>");
        assert_eq!(
            BTreeMap::<String, Vec<i8>>::wire_type().to_string(),
            "sorted_map<string,list<byte>>"
        );
        assert_eq!(IndexMap::<i32, f32>::wire_type().to_string(), "map<int,float>");
    }

    #[test]
    fn char_outside_basic_plane_is_rejected() {
        assert_eq!('あ'.to_value().unwrap(), Value::Char(0x3042));
        assert!(matches!(
            '\u{1F600}'.to_value(),
            Err(CodecError::Mismatch { .. })
        ));
        assert!(char::from_value(Value::Char(0xD800)).is_err());
    }

    #[test]
    fn containers_convert_both_ways() {
        let queue: VecDeque<i32> = [3, 1, 2].into_iter().collect();
        let value = queue.to_value().unwrap();
        assert_eq!(VecDeque::<i32>::from_value(value).unwrap(), queue);

        let map: IndexMap<i32, String> = [(2, "b".to_string()), (1, "a".to_string())]
            .into_iter()
            .collect();
        let back = IndexMap::<i32, String>::from_value(map.to_value().unwrap()).unwrap();
        assert_eq!(back.keys().copied().collect::<Vec<_>>(), vec![2, 1]);

        let array: Box<[i8]> = vec![1, 2].into_boxed_slice();
        assert_eq!(
            array.to_value().unwrap(),
            Value::Array(vec![Value::Byte(1), Value::Byte(2)])
        );
    }

    #[test]
    fn enum_macro() {
        assert_eq!(Month::wire_type().to_string(), "Month");
        let value = Month::March.to_value().unwrap();
        assert_eq!(value, Value::Enum(EnumConstant::new(2, "March")));
        assert_eq!(Month::from_value(value).unwrap(), Month::March);

        let err = Month::from_value(Value::Enum(EnumConstant::new(7, "Smarch"))).unwrap_err();
        assert!(matches!(err, CodecError::Index { ordinal: 7, len: 3, .. }));
    }

    #[test]
    fn record_macro_descriptor() {
        let Type::Record(record) = Person::wire_type() else {
            panic!("expected record");
        };
        let names: Vec<&str> = record.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["age", "nick", "score", "born", "tags"]);
        assert!(!record.fields[0].is_nullable());
        assert!(record.fields[2].is_nullable());
        assert_eq!(record.nullable_count(), 4);
    }

    #[test]
    fn record_macro_round_trip() {
        let person = Person {
            age: 41,
            nick: None,
            score: Some(-5),
            born: Some(Month::February),
            tags: BTreeMap::from([("x".to_string(), 1)]),
        };
        let value = person.to_value().unwrap();
        assert_eq!(value.as_record().unwrap().get("nick"), Some(&Value::Null));
        assert_eq!(Person::from_value(value).unwrap(), person);
    }

    #[test]
    fn record_conversion_failures_are_instantiation_errors() {
        let wrong_field = RecordValue::new("Person").with("age", "old");
        let err = Person::from_value(Value::Record(wrong_field)).unwrap_err();
        assert!(matches!(err, CodecError::Instantiation { .. }));

        let unknown = RecordValue::new("Person").with("height", 3i32);
        let err = Person::from_value(Value::Record(unknown)).unwrap_err();
        assert!(matches!(err, CodecError::Instantiation { .. }));

        let renamed = RecordValue::new("Robot");
        let err = Person::from_value(Value::Record(renamed)).unwrap_err();
        assert!(matches!(err, CodecError::Instantiation { .. }));
    }
}
