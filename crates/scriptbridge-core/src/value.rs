//! Native slot storage.
//!
//! A [`NativeValue`] is the content of one slot of a
//! [`PropertyBuffer`](crate::PropertyBuffer). Slots start out
//! [`NativeValue::Zeroed`], which reads as the zero value of whatever kind the
//! descriptor declares (false, 0, null, empty). Writers materialize a slot
//! into a concrete variant before mutating it.

use std::hash::{Hash, Hasher};

use ordered_float::OrderedFloat;
use xxhash_rust::xxh64::Xxh64;

use crate::type_hash::hash_constants;
use crate::{
    KindTag, MulticastScriptDelegate, NativeArray, NativeMap, NativeSet, NativeStruct,
    ObjectHandle, PropertyKind, ScriptDelegate,
};

/// Soft reference: an object path plus the handle it last resolved to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SoftObjectPtr {
    pub handle: Option<ObjectHandle>,
    pub path: String,
}

/// The content of one native slot.
#[derive(Debug, Clone, Default)]
pub enum NativeValue {
    /// All-zero storage that has not been initialized.
    #[default]
    Zeroed,
    Bool(bool),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Float(f32),
    Double(f64),
    Byte(u8),
    Enum(i64),
    String(String),
    Text(String),
    Name(String),
    Object(Option<ObjectHandle>),
    Class(Option<ObjectHandle>),
    SoftObject(SoftObjectPtr),
    WeakObject(Option<ObjectHandle>),
    Interface(Option<ObjectHandle>),
    Array(NativeArray),
    Map(NativeMap),
    Set(NativeSet),
    Struct(NativeStruct),
    Delegate(ScriptDelegate),
    MulticastDelegate(MulticastScriptDelegate),
}

impl NativeValue {
    /// The initialized default of a kind.
    pub fn default_for(kind: &PropertyKind) -> Self {
        match kind {
            PropertyKind::Bool => NativeValue::Bool(false),
            PropertyKind::Int32 => NativeValue::Int32(0),
            PropertyKind::UInt32 => NativeValue::UInt32(0),
            PropertyKind::Int64 => NativeValue::Int64(0),
            PropertyKind::UInt64 => NativeValue::UInt64(0),
            PropertyKind::Float => NativeValue::Float(0.0),
            PropertyKind::Double => NativeValue::Double(0.0),
            PropertyKind::Byte => NativeValue::Byte(0),
            PropertyKind::Enum { .. } => NativeValue::Enum(0),
            PropertyKind::String => NativeValue::String(String::new()),
            PropertyKind::Text => NativeValue::Text(String::new()),
            PropertyKind::Name => NativeValue::Name(String::new()),
            PropertyKind::ObjectRef { .. } => NativeValue::Object(None),
            PropertyKind::ClassRef { .. } => NativeValue::Class(None),
            PropertyKind::SoftObjectRef { .. } => NativeValue::SoftObject(SoftObjectPtr::default()),
            PropertyKind::WeakObjectRef { .. } => NativeValue::WeakObject(None),
            PropertyKind::InterfaceRef { .. } => NativeValue::Interface(None),
            PropertyKind::Array(element) => NativeValue::Array(NativeArray::new(element)),
            PropertyKind::Map(key, value) => NativeValue::Map(NativeMap::new(key, value)),
            PropertyKind::Set(element) => NativeValue::Set(NativeSet::new(element)),
            PropertyKind::Struct { struct_type } => {
                NativeValue::Struct(NativeStruct::new(*struct_type))
            }
            PropertyKind::Delegate(_) => NativeValue::Delegate(ScriptDelegate::default()),
            PropertyKind::MulticastDelegate(_) => {
                NativeValue::MulticastDelegate(MulticastScriptDelegate::default())
            }
        }
    }

    pub fn is_zeroed(&self) -> bool {
        matches!(self, NativeValue::Zeroed)
    }

    /// Whether this value owns storage that must be destroyed explicitly.
    pub fn needs_destroy(&self) -> bool {
        !matches!(
            self,
            NativeValue::Zeroed
                | NativeValue::Bool(_)
                | NativeValue::Int32(_)
                | NativeValue::UInt32(_)
                | NativeValue::Int64(_)
                | NativeValue::UInt64(_)
                | NativeValue::Float(_)
                | NativeValue::Double(_)
                | NativeValue::Byte(_)
                | NativeValue::Enum(_)
                | NativeValue::Object(_)
                | NativeValue::Class(_)
                | NativeValue::WeakObject(_)
                | NativeValue::Interface(_)
        )
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            NativeValue::Zeroed => "zeroed",
            NativeValue::Bool(_) => "bool",
            NativeValue::Int32(_) => "int32",
            NativeValue::UInt32(_) => "uint32",
            NativeValue::Int64(_) => "int64",
            NativeValue::UInt64(_) => "uint64",
            NativeValue::Float(_) => "float",
            NativeValue::Double(_) => "double",
            NativeValue::Byte(_) => "byte",
            NativeValue::Enum(_) => "enum",
            NativeValue::String(_) => "string",
            NativeValue::Text(_) => "text",
            NativeValue::Name(_) => "name",
            NativeValue::Object(_) => "object",
            NativeValue::Class(_) => "class",
            NativeValue::SoftObject(_) => "soft object",
            NativeValue::WeakObject(_) => "weak object",
            NativeValue::Interface(_) => "interface",
            NativeValue::Array(_) => "array",
            NativeValue::Map(_) => "map",
            NativeValue::Set(_) => "set",
            NativeValue::Struct(_) => "struct",
            NativeValue::Delegate(_) => "delegate",
            NativeValue::MulticastDelegate(_) => "multicast delegate",
        }
    }

    /// Whether this value is a concrete instance of `kind`.
    ///
    /// `Zeroed` never matches; containers also compare their element kinds.
    pub fn matches_kind(&self, kind: &PropertyKind) -> bool {
        match (self, kind) {
            (NativeValue::Bool(_), PropertyKind::Bool)
            | (NativeValue::Int32(_), PropertyKind::Int32)
            | (NativeValue::UInt32(_), PropertyKind::UInt32)
            | (NativeValue::Int64(_), PropertyKind::Int64)
            | (NativeValue::UInt64(_), PropertyKind::UInt64)
            | (NativeValue::Float(_), PropertyKind::Float)
            | (NativeValue::Double(_), PropertyKind::Double)
            | (NativeValue::Byte(_), PropertyKind::Byte)
            | (NativeValue::Enum(_), PropertyKind::Enum { .. })
            | (NativeValue::String(_), PropertyKind::String)
            | (NativeValue::Text(_), PropertyKind::Text)
            | (NativeValue::Name(_), PropertyKind::Name)
            | (NativeValue::Object(_), PropertyKind::ObjectRef { .. })
            | (NativeValue::Class(_), PropertyKind::ClassRef { .. })
            | (NativeValue::SoftObject(_), PropertyKind::SoftObjectRef { .. })
            | (NativeValue::WeakObject(_), PropertyKind::WeakObjectRef { .. })
            | (NativeValue::Interface(_), PropertyKind::InterfaceRef { .. })
            | (NativeValue::Delegate(_), PropertyKind::Delegate(_))
            | (NativeValue::MulticastDelegate(_), PropertyKind::MulticastDelegate(_)) => true,
            (NativeValue::Array(array), PropertyKind::Array(element)) => {
                array.element_kind() == element.as_ref()
            }
            (NativeValue::Map(map), PropertyKind::Map(key, value)) => {
                map.key_kind() == key.as_ref() && map.value_kind() == value.as_ref()
            }
            (NativeValue::Set(set), PropertyKind::Set(element)) => {
                set.element_kind() == element.as_ref()
            }
            (NativeValue::Struct(value), PropertyKind::Struct { struct_type }) => {
                value.struct_type() == *struct_type
            }
            _ => false,
        }
    }

    /// Replace a zeroed or foreign value with the default of `kind`.
    pub fn materialize(&mut self, kind: &PropertyKind) -> &mut Self {
        if !self.matches_kind(kind) {
            *self = NativeValue::default_for(kind);
        }
        self
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            NativeValue::Bool(value) => Some(*value),
            NativeValue::Zeroed => Some(false),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            NativeValue::Int32(value) => Some(*value),
            NativeValue::Zeroed => Some(0),
            _ => None,
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        match self {
            NativeValue::UInt32(value) => Some(*value),
            NativeValue::Zeroed => Some(0),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            NativeValue::Int64(value) => Some(*value),
            NativeValue::Zeroed => Some(0),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            NativeValue::UInt64(value) => Some(*value),
            NativeValue::Zeroed => Some(0),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            NativeValue::Float(value) => Some(*value),
            NativeValue::Zeroed => Some(0.0),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            NativeValue::Double(value) => Some(*value),
            NativeValue::Zeroed => Some(0.0),
            _ => None,
        }
    }

    pub fn as_u8(&self) -> Option<u8> {
        match self {
            NativeValue::Byte(value) => Some(*value),
            NativeValue::Zeroed => Some(0),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<i64> {
        match self {
            NativeValue::Enum(value) => Some(*value),
            NativeValue::Zeroed => Some(0),
            _ => None,
        }
    }

    /// String, text or name content.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            NativeValue::String(value) | NativeValue::Text(value) | NativeValue::Name(value) => {
                Some(value)
            }
            NativeValue::Zeroed => Some(""),
            _ => None,
        }
    }

    /// The handle held by any object-reference variant.
    ///
    /// Returns `Some(None)` for a null reference and `None` for non-reference values.
    pub fn as_object(&self) -> Option<Option<ObjectHandle>> {
        match self {
            NativeValue::Object(handle)
            | NativeValue::Class(handle)
            | NativeValue::WeakObject(handle)
            | NativeValue::Interface(handle) => Some(*handle),
            NativeValue::SoftObject(ptr) => Some(ptr.handle),
            NativeValue::Zeroed => Some(None),
            _ => None,
        }
    }

    /// Hash of this value as a map key or set element.
    ///
    /// Floats hash by total order so NaN keys stay findable.
    pub fn key_hash(&self) -> u64 {
        let mut hasher = Xxh64::new(hash_constants::KEY);
        let tag: Option<KindTag> = self.key_tag();
        hasher.write_u8(tag.map(u8::from).unwrap_or(u8::MAX));
        match self {
            NativeValue::Bool(value) => value.hash(&mut hasher),
            NativeValue::Int32(value) => value.hash(&mut hasher),
            NativeValue::UInt32(value) => value.hash(&mut hasher),
            NativeValue::Int64(value) | NativeValue::Enum(value) => value.hash(&mut hasher),
            NativeValue::UInt64(value) => value.hash(&mut hasher),
            NativeValue::Float(value) => OrderedFloat(*value).hash(&mut hasher),
            NativeValue::Double(value) => OrderedFloat(*value).hash(&mut hasher),
            NativeValue::Byte(value) => value.hash(&mut hasher),
            NativeValue::String(value) | NativeValue::Text(value) | NativeValue::Name(value) => {
                value.hash(&mut hasher)
            }
            NativeValue::Object(handle)
            | NativeValue::Class(handle)
            | NativeValue::WeakObject(handle)
            | NativeValue::Interface(handle) => handle.hash(&mut hasher),
            NativeValue::SoftObject(ptr) => ptr.path.hash(&mut hasher),
            _ => {}
        }
        hasher.finish()
    }

    /// Key equality consistent with [`NativeValue::key_hash`].
    pub fn key_eq(&self, other: &NativeValue) -> bool {
        match (self, other) {
            (NativeValue::Bool(a), NativeValue::Bool(b)) => a == b,
            (NativeValue::Int32(a), NativeValue::Int32(b)) => a == b,
            (NativeValue::UInt32(a), NativeValue::UInt32(b)) => a == b,
            (NativeValue::Int64(a), NativeValue::Int64(b)) => a == b,
            (NativeValue::UInt64(a), NativeValue::UInt64(b)) => a == b,
            (NativeValue::Float(a), NativeValue::Float(b)) => OrderedFloat(*a) == OrderedFloat(*b),
            (NativeValue::Double(a), NativeValue::Double(b)) => {
                OrderedFloat(*a) == OrderedFloat(*b)
            }
            (NativeValue::Byte(a), NativeValue::Byte(b)) => a == b,
            (NativeValue::Enum(a), NativeValue::Enum(b)) => a == b,
            (NativeValue::String(a), NativeValue::String(b))
            | (NativeValue::Text(a), NativeValue::Text(b))
            | (NativeValue::Name(a), NativeValue::Name(b)) => a == b,
            (NativeValue::Object(a), NativeValue::Object(b))
            | (NativeValue::Class(a), NativeValue::Class(b))
            | (NativeValue::WeakObject(a), NativeValue::WeakObject(b))
            | (NativeValue::Interface(a), NativeValue::Interface(b)) => a == b,
            (NativeValue::SoftObject(a), NativeValue::SoftObject(b)) => a.path == b.path,
            _ => false,
        }
    }

    fn key_tag(&self) -> Option<KindTag> {
        Some(match self {
            NativeValue::Bool(_) => KindTag::Bool,
            NativeValue::Int32(_) => KindTag::Int32,
            NativeValue::UInt32(_) => KindTag::UInt32,
            NativeValue::Int64(_) => KindTag::Int64,
            NativeValue::UInt64(_) => KindTag::UInt64,
            NativeValue::Float(_) => KindTag::Float,
            NativeValue::Double(_) => KindTag::Double,
            NativeValue::Byte(_) => KindTag::Byte,
            NativeValue::Enum(_) => KindTag::Enum,
            NativeValue::String(_) => KindTag::String,
            NativeValue::Text(_) => KindTag::Text,
            NativeValue::Name(_) => KindTag::Name,
            NativeValue::Object(_) => KindTag::ObjectRef,
            NativeValue::Class(_) => KindTag::ClassRef,
            NativeValue::SoftObject(_) => KindTag::SoftObjectRef,
            NativeValue::WeakObject(_) => KindTag::WeakObjectRef,
            NativeValue::Interface(_) => KindTag::InterfaceRef,
            _ => return None,
        })
    }
}
