//! JSON declaration files naming enums and records.
//!
//! ```json
//! {
//!   "enums":   [ { "name": "Month", "constants": ["JANUARY", "FEBRUARY"] } ],
//!   "records": [ { "name": "Person", "fields": [
//!       { "name": "age", "type": "int" },
//!       { "name": "score", "type": "int", "optional": true } ] } ]
//! }
//! ```

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::RegistryConfig;
use crate::error::{CodecError, Result};
use crate::types::{EnumType, RecordType, Type};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeclarationFile {
    #[serde(default)]
    pub enums: Vec<EnumDecl>,
    #[serde(default)]
    pub records: Vec<RecordDecl>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnumDecl {
    pub name: String,
    pub constants: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecordDecl {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldDecl>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldDecl {
    pub name: String,
    /// Type expression, e.g. `list<string>` or `Person`.
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub optional: bool,
}

impl DeclarationFile {
    /// Parse declarations from a JSON string.
    pub fn parse(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a declaration file, enforcing the configured limits.
    pub fn read(path: &Path, config: &RegistryConfig) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|err| {
            CodecError::Declaration(format!("failed opening {}: {err}", path.display()))
        })?;
        let metadata = file
            .metadata()
            .map_err(|err| CodecError::Declaration(err.to_string()))?;
        if !metadata.is_file() {
            return Err(CodecError::Declaration(format!(
                "not a regular file: {}",
                path.display()
            )));
        }

        let max_bytes = config.max_declaration_file_size;
        if metadata.len() > max_bytes as u64 {
            return Err(CodecError::Declaration(format!(
                "declaration file too large ({} bytes): {}",
                metadata.len(),
                path.display()
            )));
        }

        let read_limit = u64::try_from(max_bytes.saturating_add(1)).unwrap_or(u64::MAX);
        let mut content = String::new();
        file.take(read_limit)
            .read_to_string(&mut content)
            .map_err(|err| {
                CodecError::Declaration(format!("failed reading {}: {err}", path.display()))
            })?;
        if content.len() > max_bytes {
            return Err(CodecError::Declaration(format!(
                "declaration file too large while reading: {}",
                path.display()
            )));
        }

        let declarations = Self::parse(&content)?;
        if declarations.len() > config.max_declarations {
            return Err(CodecError::Declaration(format!(
                "declaration count exceeds configured max ({}): {}",
                config.max_declarations,
                declarations.len()
            )));
        }
        Ok(declarations)
    }

    pub fn len(&self) -> usize {
        self.enums.len() + self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Convert into enum and record descriptors, checking names are unique.
    pub fn into_types(self) -> Result<Vec<Type>> {
        let mut names = HashSet::new();
        let mut types = Vec::with_capacity(self.len());

        for decl in self.enums {
            check_name(&mut names, &decl.name)?;
            let mut constants = HashSet::new();
            for constant in &decl.constants {
                if !constants.insert(constant.as_str()) {
                    return Err(CodecError::Declaration(format!(
                        "enum {} repeats constant {constant}",
                        decl.name
                    )));
                }
            }
            types.push(Type::enumeration(EnumType::new(decl.name, decl.constants)));
        }

        for decl in self.records {
            check_name(&mut names, &decl.name)?;
            let mut builder = RecordType::builder(decl.name);
            for field in decl.fields {
                let ty: Type = field.ty.parse()?;
                builder = builder.field_with(field.name, ty, field.optional);
            }
            types.push(Type::record(builder.build()));
        }

        Ok(types)
    }
}

fn check_name(names: &mut HashSet<String>, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(CodecError::Declaration("empty type name".to_string()));
    }
    if let Ok(ty) = name.parse::<Type>() {
        if !matches!(ty, Type::Named(_)) {
            return Err(CodecError::Declaration(format!(
                "{name} is a built-in type name"
            )));
        }
    } else {
        return Err(CodecError::Declaration(format!("invalid type name {name:?}")));
    }
    if !names.insert(name.to_string()) {
        return Err(CodecError::Declaration(format!("{name} declared twice")));
    }
    Ok(())
}
