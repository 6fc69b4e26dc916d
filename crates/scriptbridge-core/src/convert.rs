//! Typed access to native slots for native function bodies.
//!
//! - [`FromNative`]: read a Rust value out of a [`NativeValue`]
//! - [`IntoNative`]: turn a Rust value into a [`NativeValue`]
//!
//! ```ignore
//! let health: i32 = ctx.param("Health")?;
//! ctx.set_return(health > 0)?;
//! ```

use crate::{NativeArray, NativeError, NativeValue, ObjectHandle, PropertyKind};

/// Extract a value from a native slot.
pub trait FromNative: Sized {
    fn from_native(value: &NativeValue) -> Result<Self, NativeError>;
}

/// Convert a value into a native slot.
pub trait IntoNative {
    fn into_native(self) -> NativeValue;
}

fn mismatch(expected: &'static str, value: &NativeValue) -> NativeError {
    NativeError::TypeMismatch {
        expected,
        actual: value.type_name(),
    }
}

// ============================================================================
// Scalars
// ============================================================================

macro_rules! impl_native_scalar {
    ($($ty:ty => $variant:ident, $accessor:ident, $name:literal);* $(;)?) => {
        $(
            impl FromNative for $ty {
                fn from_native(value: &NativeValue) -> Result<Self, NativeError> {
                    value.$accessor().ok_or_else(|| mismatch($name, value))
                }
            }

            impl IntoNative for $ty {
                fn into_native(self) -> NativeValue {
                    NativeValue::$variant(self)
                }
            }
        )*
    };
}

impl_native_scalar! {
    bool => Bool, as_bool, "bool";
    i32 => Int32, as_i32, "int32";
    u32 => UInt32, as_u32, "uint32";
    i64 => Int64, as_i64, "int64";
    u64 => UInt64, as_u64, "uint64";
    f32 => Float, as_f32, "float";
    f64 => Double, as_f64, "double";
    u8 => Byte, as_u8, "byte";
}

// ============================================================================
// Strings
// ============================================================================

impl FromNative for String {
    fn from_native(value: &NativeValue) -> Result<Self, NativeError> {
        value
            .as_str()
            .map(str::to_owned)
            .ok_or_else(|| mismatch("string", value))
    }
}

impl IntoNative for String {
    fn into_native(self) -> NativeValue {
        NativeValue::String(self)
    }
}

impl IntoNative for &str {
    fn into_native(self) -> NativeValue {
        NativeValue::String(self.to_owned())
    }
}

// ============================================================================
// Object references
// ============================================================================

impl FromNative for Option<ObjectHandle> {
    fn from_native(value: &NativeValue) -> Result<Self, NativeError> {
        value.as_object().ok_or_else(|| mismatch("object", value))
    }
}

impl IntoNative for Option<ObjectHandle> {
    fn into_native(self) -> NativeValue {
        NativeValue::Object(self)
    }
}

impl IntoNative for ObjectHandle {
    fn into_native(self) -> NativeValue {
        NativeValue::Object(Some(self))
    }
}

// ============================================================================
// Containers
// ============================================================================

impl FromNative for NativeArray {
    fn from_native(value: &NativeValue) -> Result<Self, NativeError> {
        match value {
            NativeValue::Array(array) => Ok(array.clone()),
            _ => Err(mismatch("array", value)),
        }
    }
}

impl IntoNative for NativeArray {
    fn into_native(self) -> NativeValue {
        NativeValue::Array(self)
    }
}

impl FromNative for Vec<u8> {
    fn from_native(value: &NativeValue) -> Result<Self, NativeError> {
        match value {
            NativeValue::Array(array) => array
                .as_bytes()
                .map(<[u8]>::to_vec)
                .ok_or_else(|| mismatch("byte array", value)),
            NativeValue::Zeroed => Ok(Vec::new()),
            _ => Err(mismatch("byte array", value)),
        }
    }
}

impl IntoNative for Vec<u8> {
    fn into_native(self) -> NativeValue {
        NativeValue::Array(NativeArray::from_bytes(self))
    }
}

impl FromNative for Vec<i32> {
    fn from_native(value: &NativeValue) -> Result<Self, NativeError> {
        match value {
            NativeValue::Array(array) if array.element_kind() == &PropertyKind::Int32 => array
                .iter()
                .map(|element| i32::from_native(&element))
                .collect(),
            NativeValue::Zeroed => Ok(Vec::new()),
            _ => Err(mismatch("int32 array", value)),
        }
    }
}

impl IntoNative for Vec<i32> {
    fn into_native(self) -> NativeValue {
        let values = self.into_iter().map(NativeValue::Int32).collect();
        NativeValue::Array(NativeArray::from_values(&PropertyKind::Int32, values))
    }
}
