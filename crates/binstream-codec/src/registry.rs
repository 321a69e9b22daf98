use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, trace};

use crate::codec::{primitive_codec, SharedCodec, PRIMITIVE_TYPES};
use crate::composite::{ArrayCodec, CollectionCodec, EnumCodec, MapCodec};
use crate::config::RegistryConfig;
use crate::declarations::DeclarationFile;
use crate::error::{CodecError, Result};
use crate::record::RecordCodec;
use crate::types::{RecordType, Type};

/// Type-keyed registry of codecs, seeded with the primitive set.
///
/// Hand-registered codecs are keyed by the canonical text of their [`Type`].
/// Codecs built on demand for composites, enums and records are cached by
/// the full descriptor, so two inline records sharing a name never share a
/// codec. Declared records fall back to a derived [`RecordCodec`] when
/// generic records are enabled. The registry is `Send + Sync` and meant to
/// be shared through an `Arc`.
#[derive(Debug)]
pub struct CodecRegistry {
    registered: RwLock<HashMap<String, SharedCodec>>,
    derived: RwLock<HashMap<Type, SharedCodec>>,
    declarations: RwLock<HashMap<String, Type>>,
    generic_records: AtomicBool,
    config: RegistryConfig,
}

impl CodecRegistry {
    /// Create a registry with default config.
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create a registry with explicit config.
    pub fn with_config(config: RegistryConfig) -> Self {
        let mut registered = HashMap::new();
        for ty in PRIMITIVE_TYPES {
            if let Some(codec) = primitive_codec(&ty) {
                registered.insert(ty.to_string(), codec);
            }
        }

        Self {
            registered: RwLock::new(registered),
            derived: RwLock::new(HashMap::new()),
            declarations: RwLock::new(HashMap::new()),
            generic_records: AtomicBool::new(config.generic_records),
            config,
        }
    }

    /// Register a codec for a type, replacing any previous one.
    ///
    /// Derived codecs are dropped since they may embed the replaced codec.
    pub fn register(&self, ty: &Type, codec: SharedCodec) {
        let key = ty.to_string();
        debug!(ty = %key, "registered codec");
        self.registered
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, codec);
        self.clear_derived();
    }

    /// Declare a named enum or record so `Named` references resolve to it.
    ///
    /// Derived codecs are dropped so composites pick up the new layout.
    pub fn declare(&self, ty: Type) -> Result<()> {
        let name = match &ty {
            Type::Enum(e) => e.name.clone(),
            Type::Record(r) => r.name.clone(),
            other => {
                return Err(CodecError::Declaration(format!(
                    "only enums and records can be declared, got {other}"
                )))
            }
        };

        self.declarations
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.clone(), ty);
        self.clear_derived();
        debug!(%name, "declared type");
        Ok(())
    }

    fn clear_derived(&self) {
        let mut derived = self.derived.write().unwrap_or_else(PoisonError::into_inner);
        if !derived.is_empty() {
            trace!(dropped = derived.len(), "cleared derived codecs");
            derived.clear();
        }
    }

    /// Load declarations from a JSON file and declare each of them.
    ///
    /// Returns the number of types declared.
    pub fn load_declarations(&self, path: &Path) -> Result<usize> {
        let types = DeclarationFile::read(path, &self.config)?.into_types()?;
        let count = types.len();
        for ty in types {
            self.declare(ty)?;
        }
        debug!(?path, count, "loaded declarations");
        Ok(count)
    }

    /// Look up a declared enum or record by name.
    pub fn declaration(&self, name: &str) -> Option<Type> {
        self.declarations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Enable or disable the derived record fallback.
    pub fn set_generic_records(&self, enabled: bool) {
        self.generic_records.store(enabled, Ordering::SeqCst);
    }

    pub fn generic_records(&self) -> bool {
        self.generic_records.load(Ordering::SeqCst)
    }

    /// Check if a codec is registered or cached for the type.
    pub fn is_registered(&self, ty: &Type) -> bool {
        self.registered
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&ty.to_string())
            || self
                .derived
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .contains_key(ty)
    }

    /// Keys of every registered or cached codec, sorted and deduplicated.
    pub fn registered_types(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .registered
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        keys.extend(
            self.derived
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .keys()
                .map(Type::to_string),
        );
        keys.sort_unstable();
        keys.dedup();
        keys
    }

    /// Names of every declared enum and record, sorted.
    pub fn declared_types(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .declarations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort_unstable();
        names
    }

    /// Get registry configuration.
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Find or build the codec for a type.
    pub fn resolve(&self, ty: &Type) -> Result<SharedCodec> {
        let mut in_progress = Vec::new();
        self.resolve_with(ty, &mut in_progress)
    }

    fn cached(&self, ty: &Type) -> Option<SharedCodec> {
        let registered = self
            .registered
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&ty.to_string())
            .cloned();
        registered.or_else(|| {
            self.derived
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .get(ty)
                .cloned()
        })
    }

    /// Insert unless another thread won the race; either way return the cached codec.
    fn cache(&self, ty: &Type, codec: SharedCodec) -> SharedCodec {
        let mut derived = self.derived.write().unwrap_or_else(PoisonError::into_inner);
        derived.entry(ty.clone()).or_insert(codec).clone()
    }

    fn resolve_with(&self, ty: &Type, in_progress: &mut Vec<String>) -> Result<SharedCodec> {
        if let Some(codec) = self.cached(ty) {
            return Ok(codec);
        }

        let codec: SharedCodec = match ty {
            Type::Enum(e) => Arc::new(EnumCodec::new(Arc::clone(e))),
            Type::Array(element) => Arc::new(ArrayCodec::new(
                self.resolve_with(element, in_progress)?,
            )),
            Type::Collection { kind, element } => Arc::new(CollectionCodec::new(
                *kind,
                self.resolve_with(element, in_progress)?,
            )),
            Type::Map { kind, key, value } => Arc::new(MapCodec::new(
                *kind,
                self.resolve_with(key, in_progress)?,
                self.resolve_with(value, in_progress)?,
            )),
            Type::Record(record) => self.derive_record(record, in_progress)?,
            Type::Named(name) => {
                let Some(declared) = self.declaration(name) else {
                    return Err(CodecError::UnsupportedType(name.clone()));
                };
                return self.resolve_with(&declared, in_progress);
            }
            Type::Custom(name) => return Err(CodecError::UnsupportedType(name.clone())),
            primitive => primitive_codec(primitive)
                .ok_or_else(|| CodecError::UnsupportedType(primitive.to_string()))?,
        };

        Ok(self.cache(ty, codec))
    }

    fn derive_record(
        &self,
        record: &Arc<RecordType>,
        in_progress: &mut Vec<String>,
    ) -> Result<SharedCodec> {
        if !self.generic_records() {
            return Err(CodecError::UnsupportedType(record.name.clone()));
        }

        if let Some(start) = in_progress.iter().position(|name| *name == record.name) {
            let mut cycle = in_progress[start..].to_vec();
            cycle.push(record.name.clone());
            return Err(CodecError::CyclicSchema(cycle.join(" -> ")));
        }

        in_progress.push(record.name.clone());
        let codecs: Result<Vec<SharedCodec>> = record
            .fields
            .iter()
            .map(|field| self.resolve_with(&field.ty, in_progress))
            .collect();
        in_progress.pop();

        let codec = RecordCodec::new(Arc::clone(record), codecs?)?;
        debug!(
            record = %record.name,
            fields = record.fields.len(),
            nullable_bytes = codec.nullable_bytes(),
            "derived record codec"
        );
        Ok(Arc::new(codec))
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::new()
    }
}
