//! Conversion between wire values and JSON, guided by a type descriptor.
//!
//! Maps with string keys become JSON objects; any other map becomes an array
//! of `[key, value]` pairs. Enums are written as constant names, chars as
//! one-character strings, and non-finite floats as `"NaN"`, `"inf"` or
//! `"-inf"`.

use std::collections::{BTreeMap, BTreeSet};

use indexmap::{IndexMap, IndexSet};
use ordered_float::OrderedFloat;
use serde_json::{Map, Number, Value as Json};

use crate::error::{CodecError, Result};
use crate::registry::CodecRegistry;
use crate::types::{CollectionKind, Container, EnumType, MapKind, RecordType, Type};
use crate::value::{EnumConstant, RecordValue, Value};

/// Render a value as JSON.
pub fn to_json(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Byte(v) => Json::from(*v),
        Value::Boolean(v) => Json::Bool(*v),
        Value::Char(unit) => match char::from_u32(u32::from(*unit)) {
            Some(c) => Json::String(c.to_string()),
            None => Json::from(*unit),
        },
        Value::Short(v) => Json::from(*v),
        Value::Int(v) => Json::from(*v),
        Value::Long(v) => Json::from(*v),
        Value::Float(v) => float_to_json(f64::from(v.0)),
        Value::Double(v) => float_to_json(v.0),
        Value::String(s) => Json::String(s.clone()),
        Value::Enum(constant) => Json::String(constant.name.clone()),
        Value::Array(items) | Value::List(items) => items.iter().map(to_json).collect(),
        Value::Set(items) => items.iter().map(to_json).collect(),
        Value::SortedSet(items) => items.iter().map(to_json).collect(),
        Value::Map(entries) => map_to_json(entries.iter()),
        Value::SortedMap(entries) => map_to_json(entries.iter()),
        Value::Record(record) => Json::Object(
            record
                .fields()
                .map(|(name, v)| (name.to_string(), to_json(v)))
                .collect(),
        ),
    }
}

fn float_to_json(v: f64) -> Json {
    match Number::from_f64(v) {
        Some(n) => Json::Number(n),
        None => Json::String(v.to_string()),
    }
}

fn map_to_json<'a>(entries: impl Iterator<Item = (&'a Value, &'a Value)> + Clone) -> Json {
    if entries.clone().all(|(k, _)| matches!(k, Value::String(_))) {
        let object: Map<String, Json> = entries
            .filter_map(|(k, v)| k.as_str().map(|k| (k.to_string(), to_json(v))))
            .collect();
        Json::Object(object)
    } else {
        entries
            .map(|(k, v)| Json::Array(vec![to_json(k), to_json(v)]))
            .collect()
    }
}

fn json_kind(json: &Json) -> &'static str {
    match json {
        Json::Null => "null",
        Json::Bool(_) => "boolean",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}

fn mismatch(ty: &Type, json: &Json) -> CodecError {
    CodecError::mismatch(ty, json_kind(json))
}

/// Build a value of type `ty` from JSON. Named types are looked up in `registry`.
pub fn from_json(ty: &Type, json: &Json, registry: &CodecRegistry) -> Result<Value> {
    match ty {
        Type::Byte => integer(ty, json).map(Value::Byte),
        Type::Short => integer(ty, json).map(Value::Short),
        Type::Int => integer(ty, json).map(Value::Int),
        Type::Long => integer(ty, json).map(Value::Long),
        Type::Boolean => json
            .as_bool()
            .map(Value::Boolean)
            .ok_or_else(|| mismatch(ty, json)),
        Type::Char => char_from_json(ty, json),
        Type::Float => float(ty, json).map(|v| Value::Float(OrderedFloat(v as f32))),
        Type::Double => float(ty, json).map(|v| Value::Double(OrderedFloat(v))),
        Type::String => json
            .as_str()
            .map(Value::from)
            .ok_or_else(|| mismatch(ty, json)),
        Type::Enum(e) => enum_from_json(e, json),
        Type::Array(element) => elements(ty, element, json, registry).map(Value::Array),
        Type::Collection { kind, element } => {
            collection_from_json(ty, *kind, element, json, registry)
        }
        Type::Map { kind, key, value } => map_from_json(ty, *kind, key, value, json, registry),
        Type::Record(record) => record_from_json(record, json, registry),
        Type::Named(name) => match registry.declaration(name) {
            Some(declared) => from_json(&declared, json, registry),
            None => Err(CodecError::UnsupportedType(name.clone())),
        },
        Type::Custom(name) => Err(CodecError::UnsupportedType(name.clone())),
    }
}

fn integer<T: TryFrom<i64>>(ty: &Type, json: &Json) -> Result<T> {
    json.as_i64()
        .and_then(|v| T::try_from(v).ok())
        .ok_or_else(|| mismatch(ty, json))
}

fn float(ty: &Type, json: &Json) -> Result<f64> {
    match json {
        Json::Number(n) => n.as_f64().ok_or_else(|| mismatch(ty, json)),
        Json::String(s) => s.parse::<f64>().map_err(|_| mismatch(ty, json)),
        _ => Err(mismatch(ty, json)),
    }
}

fn char_from_json(ty: &Type, json: &Json) -> Result<Value> {
    match json {
        Json::String(s) => {
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Value::from_char(c).ok_or_else(|| mismatch(ty, json)),
                _ => Err(mismatch(ty, json)),
            }
        }
        Json::Number(_) => integer(ty, json).map(Value::Char),
        _ => Err(mismatch(ty, json)),
    }
}

fn enum_from_json(ty: &EnumType, json: &Json) -> Result<Value> {
    let index = match json {
        Json::String(name) => ty.ordinal_of(name),
        Json::Number(n) => n.as_u64().and_then(|v| usize::try_from(v).ok()),
        _ => None,
    };

    match index.and_then(|i| Some((i, ty.constant(i)?))) {
        Some((i, name)) => Ok(Value::Enum(EnumConstant::new(
            u32::try_from(i).map_err(|_| CodecError::LengthOverflow(i))?,
            name,
        ))),
        None => Err(CodecError::mismatch(
            format!("constant of {}", ty.name),
            json_kind(json),
        )),
    }
}

fn elements(
    ty: &Type,
    element: &Type,
    json: &Json,
    registry: &CodecRegistry,
) -> Result<Vec<Value>> {
    let Json::Array(items) = json else {
        return Err(mismatch(ty, json));
    };
    items
        .iter()
        .map(|item| from_json(element, item, registry))
        .collect()
}

fn collection_from_json(
    ty: &Type,
    kind: CollectionKind,
    element: &Type,
    json: &Json,
    registry: &CodecRegistry,
) -> Result<Value> {
    let items = elements(ty, element, json, registry)?;
    let value = match kind.container() {
        Container::Sequence => Value::List(items),
        Container::InsertionSet => Value::Set(items.into_iter().collect::<IndexSet<_>>()),
        Container::SortedSet => Value::SortedSet(items.into_iter().collect::<BTreeSet<_>>()),
    };
    Ok(value)
}

fn map_key_from_json(key_ty: &Type, key: &str, registry: &CodecRegistry) -> Result<Value> {
    if *key_ty == Type::String {
        return Ok(Value::from(key));
    }
    if let Ok(parsed) = serde_json::from_str::<Json>(key) {
        if let Ok(value) = from_json(key_ty, &parsed, registry) {
            return Ok(value);
        }
    }
    from_json(key_ty, &Json::String(key.to_string()), registry)
}

fn map_from_json(
    ty: &Type,
    kind: MapKind,
    key_ty: &Type,
    value_ty: &Type,
    json: &Json,
    registry: &CodecRegistry,
) -> Result<Value> {
    let mut entries = Vec::new();
    match json {
        Json::Object(object) => {
            for (k, v) in object {
                entries.push((
                    map_key_from_json(key_ty, k, registry)?,
                    from_json(value_ty, v, registry)?,
                ));
            }
        }
        Json::Array(pairs) => {
            for pair in pairs {
                match pair.as_array().map(Vec::as_slice) {
                    Some([k, v]) => entries.push((
                        from_json(key_ty, k, registry)?,
                        from_json(value_ty, v, registry)?,
                    )),
                    _ => return Err(mismatch(ty, pair)),
                }
            }
        }
        _ => return Err(mismatch(ty, json)),
    }

    if kind.is_sorted() {
        Ok(Value::SortedMap(entries.into_iter().collect::<BTreeMap<_, _>>()))
    } else {
        Ok(Value::Map(entries.into_iter().collect::<IndexMap<_, _>>()))
    }
}

fn record_from_json(ty: &RecordType, json: &Json, registry: &CodecRegistry) -> Result<Value> {
    let Json::Object(object) = json else {
        return Err(CodecError::mismatch(&ty.name, json_kind(json)));
    };

    if let Some(unknown) = object.keys().find(|k| ty.field(k).is_none()) {
        return Err(CodecError::instantiation(
            &ty.name,
            format!("unknown field {unknown}"),
        ));
    }

    let mut record = RecordValue::new(ty.name.clone());
    for field in &ty.fields {
        let value = match object.get(&field.name) {
            None | Some(Json::Null) => Value::Null,
            Some(v) => from_json(&field.ty, v, registry)?,
        };
        record.set(field.name.clone(), value);
    }
    Ok(Value::Record(record))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn registry() -> CodecRegistry {
        let registry = CodecRegistry::new();
        registry
            .declare(Type::enumeration(EnumType::new("Month", ["JANUARY", "MAY"])))
            .unwrap();
        registry
            .declare(Type::record(
                RecordType::builder("Person")
                    .field("age", Type::Int)
                    .field("born", Type::named("Month"))
                    .optional("score", Type::Long)
                    .build(),
            ))
            .unwrap();
        registry
    }

    fn parse(ty: &str, json: Json) -> Value {
        from_json(&ty.parse().unwrap(), &json, &registry()).unwrap()
    }

    #[test]
    fn primitives() {
        assert_eq!(parse("byte", json!(-3)), Value::Byte(-3));
        assert_eq!(parse("char", json!("あ")), Value::Char(0x3042));
        assert_eq!(parse("double", json!("NaN")), Value::from(f64::NAN));
        assert_eq!(parse("float", json!(1.5)), Value::from(1.5f32));
        assert_eq!(to_json(&Value::Char(0x3042)), json!("あ"));
        assert_eq!(to_json(&Value::from(f64::INFINITY)), json!("inf"));
    }

    #[test]
    fn integer_range_is_checked() {
        let err = from_json(&Type::Byte, &json!(300), &registry()).unwrap_err();
        assert!(matches!(err, CodecError::Mismatch { found: "number", .. }));
    }

    #[test]
    fn record_with_enum_and_absent_field() {
        let value = parse("Person", json!({ "age": 40, "born": "MAY" }));
        let expected = RecordValue::new("Person")
            .with("age", 40i32)
            .with("born", EnumConstant::new(1, "MAY"))
            .with("score", Value::Null);
        assert_eq!(value, Value::Record(expected));
        assert_eq!(
            to_json(&value),
            json!({ "age": 40, "born": "MAY", "score": null })
        );
    }

    #[test]
    fn record_rejects_unknown_fields() {
        let err = from_json(
            &Type::named("Person"),
            &json!({ "age": 1, "height": 2 }),
            &registry(),
        )
        .unwrap_err();
        assert!(matches!(err, CodecError::Instantiation { .. }));
    }

    #[test]
    fn maps_from_objects_and_pairs() {
        let by_object = parse("sorted_map<int,string>", json!({ "2": "b", "1": "a" }));
        let by_pairs = parse("sorted_map<int,string>", json!([[2, "b"], [1, "a"]]));
        assert_eq!(by_object, by_pairs);
        assert_eq!(to_json(&by_pairs), json!([[1, "a"], [2, "b"]]));

        let strings = parse("map<string,int>", json!({ "k": 1 }));
        assert_eq!(to_json(&strings), json!({ "k": 1 }));
    }

    #[test]
    fn collections() {
        let value = parse("sorted_set<string>", json!(["b", "a", "b"]));
        assert_eq!(to_json(&value), json!(["a", "b"]));

        let value = parse("array<list<boolean>>", json!([[true], []]));
        assert_eq!(to_json(&value), json!([[true], []]));
    }

    #[test]
    fn unknown_enum_constant() {
        let err = from_json(&Type::named("Month"), &json!("JUNE"), &registry()).unwrap_err();
        assert!(matches!(err, CodecError::Mismatch { .. }));
    }

    #[test]
    fn undeclared_names_are_unsupported() {
        let err = from_json(&Type::named("Ghost"), &json!({}), &registry()).unwrap_err();
        assert!(matches!(err, CodecError::UnsupportedType(_)));
    }
}
