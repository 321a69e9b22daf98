//! Type descriptors and their canonical text syntax.
//!
//! A [`Type`] names exactly one wire layout. Its `Display` form is canonical
//! and doubles as the registry key, so `list<map<string,int>>` printed and
//! parsed back yields the same descriptor.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{CodecError, Result};

/// Describes the wire layout of one value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Byte,
    Boolean,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
    String,
    Enum(Arc<EnumType>),
    Array(Box<Type>),
    Collection {
        kind: CollectionKind,
        element: Box<Type>,
    },
    Map {
        kind: MapKind,
        key: Box<Type>,
        value: Box<Type>,
    },
    Record(Arc<RecordType>),
    /// Reference to a declared enum or record.
    Named(String),
    /// A type only resolvable through a registered codec.
    Custom(String),
}

/// Requested collection interface. Decoding maps each kind to a concrete container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionKind {
    Collection,
    List,
    Queue,
    Vec,
    Set,
    IndexSet,
    SortedSet,
    BTreeSet,
}

/// Concrete container a collection decodes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    /// `Vec`, decoded as `Value::List`.
    Sequence,
    /// `IndexSet` (insertion ordered), decoded as `Value::Set`.
    InsertionSet,
    /// `BTreeSet`, decoded as `Value::SortedSet`.
    SortedSet,
}

impl CollectionKind {
    pub const ALL: [CollectionKind; 8] = [
        CollectionKind::Collection,
        CollectionKind::List,
        CollectionKind::Queue,
        CollectionKind::Vec,
        CollectionKind::Set,
        CollectionKind::IndexSet,
        CollectionKind::SortedSet,
        CollectionKind::BTreeSet,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CollectionKind::Collection => "collection",
            CollectionKind::List => "list",
            CollectionKind::Queue => "queue",
            CollectionKind::Vec => "vec",
            CollectionKind::Set => "set",
            CollectionKind::IndexSet => "index_set",
            CollectionKind::SortedSet => "sorted_set",
            CollectionKind::BTreeSet => "btree_set",
        }
    }

    pub fn container(self) -> Container {
        match self {
            CollectionKind::Collection
            | CollectionKind::List
            | CollectionKind::Queue
            | CollectionKind::Vec => Container::Sequence,
            CollectionKind::Set | CollectionKind::IndexSet => Container::InsertionSet,
            CollectionKind::SortedSet | CollectionKind::BTreeSet => Container::SortedSet,
        }
    }
}

/// Requested map interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MapKind {
    Map,
    IndexMap,
    SortedMap,
    BTreeMap,
}

impl MapKind {
    pub const ALL: [MapKind; 4] = [
        MapKind::Map,
        MapKind::IndexMap,
        MapKind::SortedMap,
        MapKind::BTreeMap,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MapKind::Map => "map",
            MapKind::IndexMap => "index_map",
            MapKind::SortedMap => "sorted_map",
            MapKind::BTreeMap => "btree_map",
        }
    }

    /// Whether the kind decodes into a `BTreeMap` rather than an `IndexMap`.
    pub fn is_sorted(self) -> bool {
        matches!(self, MapKind::SortedMap | MapKind::BTreeMap)
    }
}

/// A declared enum: a name and its constants in ordinal order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnumType {
    pub name: String,
    pub constants: Vec<String>,
}

impl EnumType {
    pub fn new<I, S>(name: impl Into<String>, constants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            constants: constants.into_iter().map(Into::into).collect(),
        }
    }

    pub fn constant(&self, ordinal: usize) -> Option<&str> {
        self.constants.get(ordinal).map(String::as_str)
    }

    pub fn ordinal_of(&self, name: &str) -> Option<usize> {
        self.constants.iter().position(|c| c == name)
    }
}

/// One declared record field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldDef {
    pub name: String,
    pub ty: Type,
    /// Set for primitive fields that may still be absent.
    pub optional: bool,
}

impl FieldDef {
    /// Non-primitive fields are always nullable; primitives only when optional.
    pub fn is_nullable(&self) -> bool {
        self.optional || !self.ty.is_primitive()
    }
}

/// A declared record: a name and an ordered field list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordType {
    pub name: String,
    pub fields: Vec<FieldDef>,
}

impl RecordType {
    pub fn builder(name: impl Into<String>) -> RecordTypeBuilder {
        RecordTypeBuilder {
            record: RecordType {
                name: name.into(),
                fields: Vec::new(),
            },
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn nullable_count(&self) -> usize {
        self.fields.iter().filter(|f| f.is_nullable()).count()
    }
}

/// Builds a [`RecordType`] field by field, in declaration order.
#[derive(Debug)]
pub struct RecordTypeBuilder {
    record: RecordType,
}

impl RecordTypeBuilder {
    /// Add a field; nullable unless `ty` is primitive.
    pub fn field(self, name: impl Into<String>, ty: Type) -> Self {
        self.field_with(name, ty, false)
    }

    /// Add a field that may be absent even when `ty` is primitive.
    pub fn optional(self, name: impl Into<String>, ty: Type) -> Self {
        self.field_with(name, ty, true)
    }

    pub fn field_with(mut self, name: impl Into<String>, ty: Type, optional: bool) -> Self {
        self.record.fields.push(FieldDef {
            name: name.into(),
            ty,
            optional,
        });
        self
    }

    pub fn build(self) -> RecordType {
        self.record
    }
}

impl Type {
    pub fn array(element: Type) -> Self {
        Type::Array(Box::new(element))
    }

    pub fn collection(kind: CollectionKind, element: Type) -> Self {
        Type::Collection {
            kind,
            element: Box::new(element),
        }
    }

    pub fn list(element: Type) -> Self {
        Self::collection(CollectionKind::List, element)
    }

    pub fn map(kind: MapKind, key: Type, value: Type) -> Self {
        Type::Map {
            kind,
            key: Box::new(key),
            value: Box::new(value),
        }
    }

    pub fn enumeration(ty: EnumType) -> Self {
        Type::Enum(Arc::new(ty))
    }

    pub fn record(ty: RecordType) -> Self {
        Type::Record(Arc::new(ty))
    }

    pub fn named(name: impl Into<String>) -> Self {
        Type::Named(name.into())
    }

    pub fn custom(name: impl Into<String>) -> Self {
        Type::Custom(name.into())
    }

    /// Machine primitives: fixed-width numerics, boolean and char. Never null.
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Type::Byte
                | Type::Boolean
                | Type::Char
                | Type::Short
                | Type::Int
                | Type::Long
                | Type::Float
                | Type::Double
        )
    }

    fn primitive_from_name(name: &str) -> Option<Self> {
        let ty = match name {
            "byte" => Type::Byte,
            "boolean" => Type::Boolean,
            "char" => Type::Char,
            "short" => Type::Short,
            "int" => Type::Int,
            "long" => Type::Long,
            "float" => Type::Float,
            "double" => Type::Double,
            "string" => Type::String,
            _ => return None,
        };
        Some(ty)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Byte => f.write_str("byte"),
            Type::Boolean => f.write_str("boolean"),
            Type::Char => f.write_str("char"),
            Type::Short => f.write_str("short"),
            Type::Int => f.write_str("int"),
            Type::Long => f.write_str("long"),
            Type::Float => f.write_str("float"),
            Type::Double => f.write_str("double"),
            Type::String => f.write_str("string"),
            Type::Enum(e) => f.write_str(&e.name),
            Type::Array(element) => write!(f, "array<{element}>"),
            Type::Collection { kind, element } => write!(f, "{}<{element}>", kind.as_str()),
            Type::Map { kind, key, value } => write!(f, "{}<{key},{value}>", kind.as_str()),
            Type::Record(r) => f.write_str(&r.name),
            Type::Named(name) | Type::Custom(name) => f.write_str(name),
        }
    }
}

impl FromStr for Type {
    type Err = CodecError;

    fn from_str(input: &str) -> Result<Self> {
        let mut parser = Parser { input, pos: 0 };
        let ty = parser.parse_type()?;
        parser.skip_ws();
        if parser.pos != input.len() {
            return Err(parser.error("unexpected trailing input"));
        }
        Ok(ty)
    }
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn error(&self, message: &str) -> CodecError {
        CodecError::TypeSyntax {
            input: self.input.to_string(),
            message: format!("{message} at offset {}", self.pos),
        }
    }

    fn skip_ws(&mut self) {
        let rest = &self.input[self.pos..];
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn peek(&mut self) -> Option<char> {
        self.skip_ws();
        self.input[self.pos..].chars().next()
    }

    fn expect(&mut self, c: char) -> Result<()> {
        if self.peek() == Some(c) {
            self.pos += c.len_utf8();
            Ok(())
        } else {
            Err(self.error(&format!("expected '{c}'")))
        }
    }

    fn ident(&mut self) -> Result<&'a str> {
        self.skip_ws();
        let input = self.input;
        let rest = &input[self.pos..];
        let len = rest
            .char_indices()
            .find(|(_, c)| !(c.is_alphanumeric() || matches!(c, '_' | '.' | '$')))
            .map_or(rest.len(), |(i, _)| i);
        if len == 0 || rest.starts_with(|c: char| c.is_ascii_digit()) {
            return Err(self.error("expected a type name"));
        }
        self.pos += len;
        Ok(&rest[..len])
    }

    fn parse_type(&mut self) -> Result<Type> {
        let name = self.ident()?;
        if let Some(primitive) = Type::primitive_from_name(name) {
            return Ok(primitive);
        }

        if name == "array" {
            self.expect('<')?;
            let element = self.parse_type()?;
            self.expect('>')?;
            return Ok(Type::array(element));
        }

        if let Some(kind) = CollectionKind::ALL.into_iter().find(|k| k.as_str() == name) {
            self.expect('<')?;
            let element = self.parse_type()?;
            self.expect('>')?;
            return Ok(Type::collection(kind, element));
        }

        if let Some(kind) = MapKind::ALL.into_iter().find(|k| k.as_str() == name) {
            self.expect('<')?;
            let key = self.parse_type()?;
            self.expect(',')?;
            let value = self.parse_type()?;
            self.expect('>')?;
            return Ok(Type::map(kind, key, value));
        }

        Ok(Type::Named(name.to_string()))
    }
}
