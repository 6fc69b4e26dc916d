//! Property descriptors: the typed description of a native field or parameter.
//!
//! A [`PropertyDescriptor`] pairs a [`PropertyKind`] with the slot index its
//! value occupies in a [`PropertyBuffer`](crate::PropertyBuffer) and the
//! [`PropertyFlags`] the invocation machinery reads (in/out/return/const).
//!
//! `PropertyKind` is a closed enum. Everything that dispatches on field kind
//! matches it exhaustively, so adding a kind means adding a variant.

use std::fmt;
use std::sync::Arc;

use bitflags::bitflags;
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::{FunctionSignature, TypeHash};

bitflags! {
    /// Flags carried alongside a descriptor.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PropertyFlags: u32 {
        /// Part of a function's parameter block.
        const PARM = 1 << 0;
        /// Written by the callee and observed after the call.
        const OUT_PARM = 1 << 1;
        /// The function's return slot.
        const RETURN_PARM = 1 << 2;
        /// Declared const; const out-params are not read back unless they are arrays.
        const CONST_PARM = 1 << 3;
        /// Passed by reference.
        const REFERENCE_PARM = 1 << 4;
        /// Safely zero-valued without running initialization.
        const ZERO_CONSTRUCTOR = 1 << 5;
        /// Event property scripts may bind handlers to.
        const BLUEPRINT_ASSIGNABLE = 1 << 6;
    }
}

/// Discriminant of a [`PropertyKind`], stable across builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum KindTag {
    Bool = 0,
    Int32 = 1,
    UInt32 = 2,
    Int64 = 3,
    UInt64 = 4,
    Float = 5,
    Double = 6,
    Byte = 7,
    Enum = 8,
    String = 9,
    Text = 10,
    Name = 11,
    ObjectRef = 12,
    ClassRef = 13,
    SoftObjectRef = 14,
    WeakObjectRef = 15,
    InterfaceRef = 16,
    Array = 17,
    Map = 18,
    Set = 19,
    Struct = 20,
    Delegate = 21,
    MulticastDelegate = 22,
}

/// Storage width of an enum property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnumUnderlying {
    UInt8,
    Int32,
    Int64,
}

impl EnumUnderlying {
    /// Truncate a value to this width, sign- or zero-extending back to i64.
    pub const fn truncate(self, value: i64) -> i64 {
        match self {
            EnumUnderlying::UInt8 => value as u8 as i64,
            EnumUnderlying::Int32 => value as i32 as i64,
            EnumUnderlying::Int64 => value,
        }
    }
}

/// The value kind of a native field or parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyKind {
    Bool,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float,
    Double,
    Byte,
    Enum {
        enum_type: TypeHash,
        underlying: EnumUnderlying,
    },
    String,
    Text,
    Name,
    ObjectRef {
        class: TypeHash,
    },
    /// Reference to a class object. An empty `meta_class` accepts any class.
    ClassRef {
        meta_class: TypeHash,
    },
    SoftObjectRef {
        class: TypeHash,
    },
    WeakObjectRef {
        class: TypeHash,
    },
    InterfaceRef {
        interface: TypeHash,
    },
    Array(Box<PropertyKind>),
    Map(Box<PropertyKind>, Box<PropertyKind>),
    Set(Box<PropertyKind>),
    /// Opaque native struct, copied generically.
    Struct {
        struct_type: TypeHash,
    },
    Delegate(Arc<FunctionSignature>),
    MulticastDelegate(Arc<FunctionSignature>),
}

impl PropertyKind {
    pub fn array(element: PropertyKind) -> Self {
        PropertyKind::Array(Box::new(element))
    }

    pub fn map(key: PropertyKind, value: PropertyKind) -> Self {
        PropertyKind::Map(Box::new(key), Box::new(value))
    }

    pub fn set(element: PropertyKind) -> Self {
        PropertyKind::Set(Box::new(element))
    }

    pub fn object(class_name: &str) -> Self {
        PropertyKind::ObjectRef {
            class: TypeHash::from_name(class_name),
        }
    }

    pub fn interface(interface_name: &str) -> Self {
        PropertyKind::InterfaceRef {
            interface: TypeHash::from_name(interface_name),
        }
    }

    pub fn class_of(meta_class_name: &str) -> Self {
        PropertyKind::ClassRef {
            meta_class: TypeHash::from_name(meta_class_name),
        }
    }

    pub fn enumeration(enum_name: &str, underlying: EnumUnderlying) -> Self {
        PropertyKind::Enum {
            enum_type: TypeHash::from_name(enum_name),
            underlying,
        }
    }

    /// Get the discriminant of this kind.
    pub const fn tag(&self) -> KindTag {
        match self {
            PropertyKind::Bool => KindTag::Bool,
            PropertyKind::Int32 => KindTag::Int32,
            PropertyKind::UInt32 => KindTag::UInt32,
            PropertyKind::Int64 => KindTag::Int64,
            PropertyKind::UInt64 => KindTag::UInt64,
            PropertyKind::Float => KindTag::Float,
            PropertyKind::Double => KindTag::Double,
            PropertyKind::Byte => KindTag::Byte,
            PropertyKind::Enum { .. } => KindTag::Enum,
            PropertyKind::String => KindTag::String,
            PropertyKind::Text => KindTag::Text,
            PropertyKind::Name => KindTag::Name,
            PropertyKind::ObjectRef { .. } => KindTag::ObjectRef,
            PropertyKind::ClassRef { .. } => KindTag::ClassRef,
            PropertyKind::SoftObjectRef { .. } => KindTag::SoftObjectRef,
            PropertyKind::WeakObjectRef { .. } => KindTag::WeakObjectRef,
            PropertyKind::InterfaceRef { .. } => KindTag::InterfaceRef,
            PropertyKind::Array(_) => KindTag::Array,
            PropertyKind::Map(_, _) => KindTag::Map,
            PropertyKind::Set(_) => KindTag::Set,
            PropertyKind::Struct { .. } => KindTag::Struct,
            PropertyKind::Delegate(_) => KindTag::Delegate,
            PropertyKind::MulticastDelegate(_) => KindTag::MulticastDelegate,
        }
    }

    /// Get the name of this kind.
    pub const fn name(&self) -> &'static str {
        match self {
            PropertyKind::Bool => "Bool",
            PropertyKind::Int32 => "Int32",
            PropertyKind::UInt32 => "UInt32",
            PropertyKind::Int64 => "Int64",
            PropertyKind::UInt64 => "UInt64",
            PropertyKind::Float => "Float",
            PropertyKind::Double => "Double",
            PropertyKind::Byte => "Byte",
            PropertyKind::Enum { .. } => "Enum",
            PropertyKind::String => "String",
            PropertyKind::Text => "Text",
            PropertyKind::Name => "Name",
            PropertyKind::ObjectRef { .. } => "ObjectRef",
            PropertyKind::ClassRef { .. } => "ClassRef",
            PropertyKind::SoftObjectRef { .. } => "SoftObjectRef",
            PropertyKind::WeakObjectRef { .. } => "WeakObjectRef",
            PropertyKind::InterfaceRef { .. } => "InterfaceRef",
            PropertyKind::Array(_) => "Array",
            PropertyKind::Map(_, _) => "Map",
            PropertyKind::Set(_) => "Set",
            PropertyKind::Struct { .. } => "Struct",
            PropertyKind::Delegate(_) => "Delegate",
            PropertyKind::MulticastDelegate(_) => "MulticastDelegate",
        }
    }

    /// Whether an all-zero slot is already a valid value of this kind.
    pub const fn is_zero_constructible(&self) -> bool {
        matches!(
            self,
            PropertyKind::Bool
                | PropertyKind::Int32
                | PropertyKind::UInt32
                | PropertyKind::Int64
                | PropertyKind::UInt64
                | PropertyKind::Float
                | PropertyKind::Double
                | PropertyKind::Byte
                | PropertyKind::Enum { .. }
                | PropertyKind::ObjectRef { .. }
                | PropertyKind::ClassRef { .. }
                | PropertyKind::WeakObjectRef { .. }
                | PropertyKind::InterfaceRef { .. }
        )
    }

    /// Whether the kind converts to and from scripting numbers.
    pub const fn is_numeric(&self) -> bool {
        matches!(
            self,
            PropertyKind::Int32
                | PropertyKind::UInt32
                | PropertyKind::Int64
                | PropertyKind::UInt64
                | PropertyKind::Float
                | PropertyKind::Double
                | PropertyKind::Byte
                | PropertyKind::Enum { .. }
        )
    }

    pub const fn is_object_reference(&self) -> bool {
        matches!(
            self,
            PropertyKind::ObjectRef { .. }
                | PropertyKind::ClassRef { .. }
                | PropertyKind::SoftObjectRef { .. }
                | PropertyKind::WeakObjectRef { .. }
                | PropertyKind::InterfaceRef { .. }
        )
    }

    pub const fn is_delegate(&self) -> bool {
        matches!(
            self,
            PropertyKind::Delegate(_) | PropertyKind::MulticastDelegate(_)
        )
    }

    /// Whether values of this kind may be map keys or set elements.
    pub const fn is_hashable(&self) -> bool {
        !matches!(
            self,
            PropertyKind::Array(_)
                | PropertyKind::Map(_, _)
                | PropertyKind::Set(_)
                | PropertyKind::Struct { .. }
                | PropertyKind::Delegate(_)
                | PropertyKind::MulticastDelegate(_)
        )
    }
}

impl fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyKind::Array(element) => write!(f, "Array<{element}>"),
            PropertyKind::Map(key, value) => write!(f, "Map<{key}, {value}>"),
            PropertyKind::Set(element) => write!(f, "Set<{element}>"),
            other => write!(f, "{}", other.name()),
        }
    }
}

/// A named, typed field or parameter and the slot it occupies.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDescriptor {
    pub name: String,
    pub kind: PropertyKind,
    pub index: usize,
    pub flags: PropertyFlags,
}

impl PropertyDescriptor {
    pub fn new(name: impl Into<String>, kind: PropertyKind) -> Self {
        Self {
            name: name.into(),
            kind,
            index: 0,
            flags: PropertyFlags::empty(),
        }
    }

    pub fn at(mut self, index: usize) -> Self {
        self.index = index;
        self
    }

    pub fn with_flags(mut self, flags: PropertyFlags) -> Self {
        self.flags |= flags;
        self
    }

    pub fn is_return(&self) -> bool {
        self.flags.contains(PropertyFlags::RETURN_PARM)
    }

    /// Parameters scripted callers may supply: every parameter except the return slot.
    pub fn is_in_param(&self) -> bool {
        self.flags.contains(PropertyFlags::PARM) && !self.is_return()
    }

    /// Out-parameters whose native storage is read back after a call.
    ///
    /// Const out-params are skipped unless they are arrays, which the native side
    /// passes by reference even when const.
    pub fn is_observable_out(&self) -> bool {
        self.flags.contains(PropertyFlags::OUT_PARM)
            && !self.is_return()
            && (matches!(self.kind, PropertyKind::Array(_))
                || !self.flags.contains(PropertyFlags::CONST_PARM))
    }

    /// Whether the slot may be left zeroed instead of initialized.
    pub fn is_zero_constructor(&self) -> bool {
        self.flags.contains(PropertyFlags::ZERO_CONSTRUCTOR) || self.kind.is_zero_constructible()
    }
}
