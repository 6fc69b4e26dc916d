//! Per-struct conversion extensions.
//!
//! Native structs are opaque to the converter. Registering a
//! [`StructConverter`] for a struct type makes that type convertible in both
//! directions.

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use scriptbridge_core::{NativeStruct, TypeHash};

use crate::{ConversionError, ScriptValue};

/// Field-level conversion for one native struct type.
pub trait StructConverter: Send + Sync {
    fn to_dynamic(&self, value: &NativeStruct) -> Result<ScriptValue, ConversionError>;

    /// Write `value` into `target`. `target` is left untouched on failure.
    fn from_dynamic(
        &self,
        value: &ScriptValue,
        target: &mut NativeStruct,
    ) -> Result<(), ConversionError>;
}

/// Registered struct converters, keyed by struct type.
#[derive(Default)]
pub struct StructConverters {
    converters: RwLock<FxHashMap<TypeHash, Arc<dyn StructConverter>>>,
}

impl StructConverters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a converter, returning the one it replaced.
    pub fn register(
        &self,
        struct_type: TypeHash,
        converter: Arc<dyn StructConverter>,
    ) -> Option<Arc<dyn StructConverter>> {
        self.converters.write().insert(struct_type, converter)
    }

    pub fn get(&self, struct_type: TypeHash) -> Option<Arc<dyn StructConverter>> {
        self.converters.read().get(&struct_type).cloned()
    }

    pub fn contains(&self, struct_type: TypeHash) -> bool {
        self.converters.read().contains_key(&struct_type)
    }
}
