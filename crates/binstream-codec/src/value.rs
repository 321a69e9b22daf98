use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::hash::{Hash, Hasher};

use indexmap::{IndexMap, IndexSet};
use ordered_float::OrderedFloat;

/// A dynamically typed wire value.
///
/// Values are `Eq + Ord + Hash` so they can be members of sets and keys of
/// maps. Insertion-ordered containers compare without regard to order, the
/// same way `IndexSet`/`IndexMap` equality works.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Null,
    Byte(i8),
    Boolean(bool),
    /// A single UTF-16 code unit.
    Char(u16),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(OrderedFloat<f32>),
    Double(OrderedFloat<f64>),
    String(String),
    Enum(EnumConstant),
    Array(Vec<Value>),
    List(Vec<Value>),
    Set(IndexSet<Value>),
    SortedSet(BTreeSet<Value>),
    Map(IndexMap<Value, Value>),
    SortedMap(BTreeMap<Value, Value>),
    Record(RecordValue),
}

/// One constant of a declared enum.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EnumConstant {
    pub ordinal: u32,
    pub name: String,
}

impl EnumConstant {
    pub fn new(ordinal: u32, name: impl Into<String>) -> Self {
        Self {
            ordinal,
            name: name.into(),
        }
    }
}

/// Field values of one record instance, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordValue {
    name: String,
    fields: IndexMap<String, Value>,
}

impl RecordValue {
    /// Create an empty instance of the named record.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: IndexMap::new(),
        }
    }

    /// Builder-style field assignment.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    /// Assign a field, returning the previous value if any.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(field.into(), value.into())
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn into_fields(self) -> IndexMap<String, Value> {
        self.fields
    }
}

impl Hash for RecordValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Equality ignores field order, so only order-free facts are hashed.
        self.name.hash(state);
        self.fields.len().hash(state);
    }
}

impl Ord for RecordValue {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name
            .cmp(&other.name)
            .then_with(|| sorted_entries(&self.fields).cmp(&sorted_entries(&other.fields)))
    }
}

impl PartialOrd for RecordValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short name of the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Byte(_) => "byte",
            Value::Boolean(_) => "boolean",
            Value::Char(_) => "char",
            Value::Short(_) => "short",
            Value::Int(_) => "int",
            Value::Long(_) => "long",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::String(_) => "string",
            Value::Enum(_) => "enum",
            Value::Array(_) => "array",
            Value::List(_) => "list",
            Value::Set(_) => "set",
            Value::SortedSet(_) => "sorted_set",
            Value::Map(_) => "map",
            Value::SortedMap(_) => "sorted_map",
            Value::Record(_) => "record",
        }
    }

    pub fn as_record(&self) -> Option<&RecordValue> {
        match self {
            Value::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Encode a Rust `char` as a single UTF-16 code unit, if it fits.
    pub fn from_char(c: char) -> Option<Self> {
        let mut units = [0u16; 2];
        match c.encode_utf16(&mut units) {
            [unit] => Some(Value::Char(*unit)),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Byte(_) => 1,
            Value::Boolean(_) => 2,
            Value::Char(_) => 3,
            Value::Short(_) => 4,
            Value::Int(_) => 5,
            Value::Long(_) => 6,
            Value::Float(_) => 7,
            Value::Double(_) => 8,
            Value::String(_) => 9,
            Value::Enum(_) => 10,
            Value::Array(_) => 11,
            Value::List(_) => 12,
            Value::Set(_) => 13,
            Value::SortedSet(_) => 14,
            Value::Map(_) => 15,
            Value::SortedMap(_) => 16,
            Value::Record(_) => 17,
        }
    }
}

fn sorted_members(set: &IndexSet<Value>) -> Vec<&Value> {
    let mut members: Vec<&Value> = set.iter().collect();
    members.sort();
    members
}

fn sorted_entries<K: Ord, V: Ord>(map: &IndexMap<K, V>) -> Vec<(&K, &V)> {
    let mut entries: Vec<(&K, &V)> = map.iter().collect();
    entries.sort();
    entries
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Byte(v) => v.hash(state),
            Value::Boolean(v) => v.hash(state),
            Value::Char(v) => v.hash(state),
            Value::Short(v) => v.hash(state),
            Value::Int(v) => v.hash(state),
            Value::Long(v) => v.hash(state),
            Value::Float(v) => v.hash(state),
            Value::Double(v) => v.hash(state),
            Value::String(v) => v.hash(state),
            Value::Enum(v) => v.hash(state),
            Value::Array(v) | Value::List(v) => v.hash(state),
            Value::Set(v) => v.len().hash(state),
            Value::SortedSet(v) => v.hash(state),
            Value::Map(v) => v.len().hash(state),
            Value::SortedMap(v) => v.hash(state),
            Value::Record(v) => v.hash(state),
        }
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Byte(a), Value::Byte(b)) => a.cmp(b),
            (Value::Boolean(a), Value::Boolean(b)) => a.cmp(b),
            (Value::Char(a), Value::Char(b)) => a.cmp(b),
            (Value::Short(a), Value::Short(b)) => a.cmp(b),
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Long(a), Value::Long(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => a.cmp(b),
            (Value::Double(a), Value::Double(b)) => a.cmp(b),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Enum(a), Value::Enum(b)) => a.cmp(b),
            (Value::Array(a), Value::Array(b)) | (Value::List(a), Value::List(b)) => a.cmp(b),
            (Value::Set(a), Value::Set(b)) => sorted_members(a).cmp(&sorted_members(b)),
            (Value::SortedSet(a), Value::SortedSet(b)) => a.cmp(b),
            (Value::Map(a), Value::Map(b)) => sorted_entries(a).cmp(&sorted_entries(b)),
            (Value::SortedMap(a), Value::SortedMap(b)) => a.cmp(b),
            (Value::Record(a), Value::Record(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v.into())
                }
            }
        )*
    };
}

impl_from! {
    i8 => Byte,
    bool => Boolean,
    i16 => Short,
    i32 => Int,
    i64 => Long,
    f32 => Float,
    f64 => Double,
    String => String,
    &str => String,
    EnumConstant => Enum,
    RecordValue => Record,
}
