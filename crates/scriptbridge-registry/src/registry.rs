//! NativeRegistry - storage for the native types a runtime reflects.
//!
//! Classes, enums and structs are stored by [`TypeHash`] with a name index
//! beside them. Registration happens up front; lookups afterwards are
//! read-only, so the runtime shares the registry behind an `Arc` without
//! further locking.
//!
//! # Example
//!
//! ```
//! use scriptbridge_core::{EnumUnderlying, NativeClass, PropertyKind};
//! use scriptbridge_registry::{EnumInfo, NativeRegistry};
//!
//! let mut registry = NativeRegistry::new();
//! let actor = NativeClass::builder("Actor")
//!     .property("Health", PropertyKind::Int32)
//!     .build();
//! registry.register_class(actor).unwrap();
//! registry
//!     .register_enum(
//!         EnumInfo::new("Team", EnumUnderlying::UInt8)
//!             .value("Red", 0)
//!             .value("Blue", 1),
//!     )
//!     .unwrap();
//!
//! assert!(registry.class_by_name("Actor").is_some());
//! assert_eq!(registry.enum_by_name("Team").and_then(|e| e.value_of("Blue")), Some(1));
//! ```

use std::sync::Arc;

use rustc_hash::FxHashMap;
use scriptbridge_core::{EnumLookup, EnumUnderlying, NativeClass, TypeHash};

use crate::RegistrationError;

/// A reflected native enum.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumInfo {
    pub name: String,
    pub hash: TypeHash,
    pub underlying: EnumUnderlying,
    pub values: Vec<(String, i64)>,
}

impl EnumInfo {
    pub fn new(name: impl Into<String>, underlying: EnumUnderlying) -> Self {
        let name = name.into();
        Self {
            hash: TypeHash::from_name(&name),
            name,
            underlying,
            values: Vec::new(),
        }
    }

    /// Add an enumerator.
    pub fn value(mut self, name: impl Into<String>, value: i64) -> Self {
        self.values.push((name.into(), value));
        self
    }

    pub fn value_of(&self, name: &str) -> Option<i64> {
        self.values.iter().find(|(n, _)| n == name).map(|(_, v)| *v)
    }

    pub fn name_of(&self, value: i64) -> Option<&str> {
        self.values
            .iter()
            .find(|(_, v)| *v == value)
            .map(|(n, _)| n.as_str())
    }
}

/// A reflected native struct. Only its identity and size are known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructInfo {
    pub name: String,
    pub hash: TypeHash,
    pub size: usize,
}

impl StructInfo {
    pub fn new(name: impl Into<String>, size: usize) -> Self {
        let name = name.into();
        Self {
            hash: TypeHash::from_name(&name),
            name,
            size,
        }
    }
}

/// Registry of native classes, enums and structs.
#[derive(Debug, Default)]
pub struct NativeRegistry {
    classes: FxHashMap<TypeHash, Arc<NativeClass>>,
    enums: FxHashMap<TypeHash, EnumInfo>,
    structs: FxHashMap<TypeHash, StructInfo>,
    /// Reverse index: name -> hash, shared by every kind of type.
    names: FxHashMap<String, TypeHash>,
}

impl NativeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn claim_name(&mut self, name: &str, hash: TypeHash) -> Result<(), RegistrationError> {
        if self.names.contains_key(name) {
            return Err(RegistrationError::DuplicateType(name.to_owned()));
        }
        self.names.insert(name.to_owned(), hash);
        Ok(())
    }

    // ==========================================================================
    // Classes
    // ==========================================================================

    /// Register a class. Its super class must already be registered.
    pub fn register_class(&mut self, class: Arc<NativeClass>) -> Result<(), RegistrationError> {
        if let Some(super_class) = class.super_class()
            && !self.classes.contains_key(&super_class.hash())
        {
            return Err(RegistrationError::TypeNotFound(super_class.name().to_owned()));
        }
        self.claim_name(class.name(), class.hash())?;
        self.classes.insert(class.hash(), class);
        Ok(())
    }

    pub fn class(&self, hash: TypeHash) -> Option<&Arc<NativeClass>> {
        self.classes.get(&hash)
    }

    pub fn class_by_name(&self, name: &str) -> Option<&Arc<NativeClass>> {
        self.names.get(name).and_then(|hash| self.classes.get(hash))
    }

    pub fn classes(&self) -> impl Iterator<Item = &Arc<NativeClass>> {
        self.classes.values()
    }

    /// Registered classes deriving from `base`, including `base` itself.
    pub fn derived_classes(&self, base: TypeHash) -> impl Iterator<Item = &Arc<NativeClass>> {
        self.classes.values().filter(move |class| class.is_child_of(base))
    }

    // ==========================================================================
    // Enums
    // ==========================================================================

    pub fn register_enum(&mut self, info: EnumInfo) -> Result<(), RegistrationError> {
        for (position, (name, _)) in info.values.iter().enumerate() {
            if info.values[..position].iter().any(|(other, _)| other == name) {
                return Err(RegistrationError::DuplicateEnumValue {
                    enum_name: info.name.clone(),
                    value_name: name.clone(),
                });
            }
        }
        self.claim_name(&info.name, info.hash)?;
        self.enums.insert(info.hash, info);
        Ok(())
    }

    pub fn enum_info(&self, hash: TypeHash) -> Option<&EnumInfo> {
        self.enums.get(&hash)
    }

    pub fn enum_by_name(&self, name: &str) -> Option<&EnumInfo> {
        self.names.get(name).and_then(|hash| self.enums.get(hash))
    }

    // ==========================================================================
    // Structs
    // ==========================================================================

    pub fn register_struct(&mut self, info: StructInfo) -> Result<(), RegistrationError> {
        self.claim_name(&info.name, info.hash)?;
        self.structs.insert(info.hash, info);
        Ok(())
    }

    pub fn struct_info(&self, hash: TypeHash) -> Option<&StructInfo> {
        self.structs.get(&hash)
    }

    pub fn struct_by_name(&self, name: &str) -> Option<&StructInfo> {
        self.names.get(name).and_then(|hash| self.structs.get(hash))
    }

    /// Name of any registered type.
    pub fn type_name(&self, hash: TypeHash) -> Option<&str> {
        self.classes
            .get(&hash)
            .map(|class| class.name())
            .or_else(|| self.enums.get(&hash).map(|info| info.name.as_str()))
            .or_else(|| self.structs.get(&hash).map(|info| info.name.as_str()))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl EnumLookup for NativeRegistry {
    fn enumerator_value(&self, enum_type: TypeHash, name: &str) -> Option<i64> {
        self.enums.get(&enum_type)?.value_of(name)
    }
}
