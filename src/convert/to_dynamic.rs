//! Native slot → script value.

use std::borrow::Cow;

use scriptbridge_core::{NativeValue, PropertyBuffer, PropertyDescriptor, PropertyKind};

use super::PropertyConverter;
use crate::{ConversionError, DelegateProperty, ScriptDict, ScriptSet, ScriptValue};

fn mismatch(value: &NativeValue, kind: &PropertyKind) -> ConversionError {
    ConversionError::Mismatch {
        value: value.type_name(),
        kind: kind.to_string(),
    }
}

impl PropertyConverter<'_> {
    /// Read the slot `descriptor` addresses in `buffer`.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn to_dynamic(
        &self,
        descriptor: &PropertyDescriptor,
        buffer: &PropertyBuffer,
    ) -> Result<ScriptValue, ConversionError> {
        let value = buffer.get(descriptor.index).ok_or(ConversionError::MissingSlot {
            index: descriptor.index,
        })?;
        match &descriptor.kind {
            PropertyKind::Delegate(signature) | PropertyKind::MulticastDelegate(signature) => {
                Ok(ScriptValue::Property(DelegateProperty::new(
                    None,
                    descriptor.name.clone(),
                    signature.clone(),
                    matches!(descriptor.kind, PropertyKind::MulticastDelegate(_)),
                )))
            }
            kind => self.value_to_dynamic(kind, value),
        }
    }

    /// Convert a single native value of `kind`.
    ///
    /// A zeroed value reads as the default of its kind.
    pub fn value_to_dynamic(
        &self,
        kind: &PropertyKind,
        value: &NativeValue,
    ) -> Result<ScriptValue, ConversionError> {
        let value: Cow<'_, NativeValue> = if value.is_zeroed() {
            Cow::Owned(NativeValue::default_for(kind))
        } else {
            Cow::Borrowed(value)
        };
        let value = value.as_ref();

        Ok(match (kind, value) {
            (PropertyKind::Bool, NativeValue::Bool(v)) => ScriptValue::Bool(*v),
            (PropertyKind::Int32, NativeValue::Int32(v)) => ScriptValue::Int(i128::from(*v)),
            (PropertyKind::UInt32, NativeValue::UInt32(v)) => ScriptValue::Int(i128::from(*v)),
            (PropertyKind::Int64, NativeValue::Int64(v)) => ScriptValue::Int(i128::from(*v)),
            (PropertyKind::UInt64, NativeValue::UInt64(v)) => ScriptValue::Int(i128::from(*v)),
            (PropertyKind::Byte, NativeValue::Byte(v)) => ScriptValue::Int(i128::from(*v)),
            (PropertyKind::Enum { .. }, NativeValue::Enum(v)) => ScriptValue::Int(i128::from(*v)),
            (PropertyKind::Float, NativeValue::Float(v)) => ScriptValue::Float(f64::from(*v)),
            (PropertyKind::Double, NativeValue::Double(v)) => ScriptValue::Float(*v),
            (PropertyKind::String, NativeValue::String(v))
            | (PropertyKind::Text, NativeValue::Text(v))
            | (PropertyKind::Name, NativeValue::Name(v)) => ScriptValue::Str(v.clone()),

            (PropertyKind::ObjectRef { .. }, NativeValue::Object(handle))
            | (PropertyKind::ClassRef { .. }, NativeValue::Class(handle))
            | (PropertyKind::WeakObjectRef { .. }, NativeValue::WeakObject(handle))
            | (PropertyKind::InterfaceRef { .. }, NativeValue::Interface(handle)) => match handle {
                Some(handle) => self.proxies.get_or_create_retained(*handle),
                None => ScriptValue::None,
            },
            (PropertyKind::SoftObjectRef { .. }, NativeValue::SoftObject(ptr)) => match ptr.handle {
                Some(handle) => self.proxies.get_or_create_retained(handle),
                None => ScriptValue::None,
            },

            (PropertyKind::Array(element), NativeValue::Array(array)) => match array.as_bytes() {
                Some(bytes) => ScriptValue::Bytes(bytes.to_vec()),
                None => ScriptValue::List(
                    array
                        .iter()
                        .map(|item| self.value_to_dynamic(element, &item))
                        .collect::<Result<_, _>>()?,
                ),
            },
            (PropertyKind::Map(key_kind, value_kind), NativeValue::Map(map)) => {
                let mut dict = ScriptDict::new();
                for (key, item) in map.iter() {
                    dict.insert(
                        self.value_to_dynamic(key_kind, key)?,
                        self.value_to_dynamic(value_kind, item)?,
                    )?;
                }
                ScriptValue::Dict(dict)
            }
            (PropertyKind::Set(element), NativeValue::Set(set)) => {
                let mut items = ScriptSet::new();
                for item in set.iter() {
                    items.insert(self.value_to_dynamic(element, item)?)?;
                }
                ScriptValue::Set(items)
            }

            (PropertyKind::Struct { struct_type }, NativeValue::Struct(data)) => {
                let converter =
                    self.structs
                        .get(*struct_type)
                        .ok_or_else(|| ConversionError::StructUnsupported {
                            struct_type: struct_type.to_string(),
                        })?;
                converter.to_dynamic(data)?
            }

            (PropertyKind::Delegate(_) | PropertyKind::MulticastDelegate(_), _) => {
                return Err(ConversionError::Unsupported {
                    kind: kind.to_string(),
                });
            }
            (kind, value) => return Err(mismatch(value, kind)),
        })
    }
}
