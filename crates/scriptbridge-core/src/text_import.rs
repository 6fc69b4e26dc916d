//! Parsing of textual default values into native slots.
//!
//! Function metadata stores parameter defaults as text. [`import_text`]
//! turns that text into a [`NativeValue`] of the parameter's kind.

use crate::{
    EnumUnderlying, ImportTextError, NativeArray, NativeValue, PropertyKind, SoftObjectPtr,
    TypeHash,
};

/// Resolves enumerator names to values.
pub trait EnumLookup {
    fn enumerator_value(&self, enum_type: TypeHash, name: &str) -> Option<i64>;
}

/// Parse `text` as a value of `kind`.
///
/// Enumerator names need `enums`; without it only integer enum defaults parse.
pub fn import_text(
    kind: &PropertyKind,
    text: &str,
    enums: Option<&dyn EnumLookup>,
) -> Result<NativeValue, ImportTextError> {
    let text = text.trim();
    let malformed = || ImportTextError::Malformed {
        kind: kind.name(),
        text: text.to_owned(),
    };
    let integer = || parse_integer(text).ok_or_else(malformed);
    let float = || parse_float(text).ok_or_else(malformed);

    Ok(match kind {
        PropertyKind::Bool => match text {
            "true" | "True" | "1" => NativeValue::Bool(true),
            "false" | "False" | "0" => NativeValue::Bool(false),
            _ => return Err(malformed()),
        },
        PropertyKind::Int32 => NativeValue::Int32(integer()? as i32),
        PropertyKind::UInt32 => NativeValue::UInt32(integer()? as u32),
        PropertyKind::Int64 => NativeValue::Int64(integer()? as i64),
        PropertyKind::UInt64 => NativeValue::UInt64(integer()? as u64),
        PropertyKind::Byte => NativeValue::Byte(integer()? as u8),
        PropertyKind::Float => NativeValue::Float(float()? as f32),
        PropertyKind::Double => NativeValue::Double(float()?),
        PropertyKind::Enum {
            enum_type,
            underlying,
        } => NativeValue::Enum(import_enum(*enum_type, *underlying, text, enums)?),
        PropertyKind::String => NativeValue::String(unquote(text).to_owned()),
        PropertyKind::Text => NativeValue::Text(unquote(text).to_owned()),
        PropertyKind::Name => NativeValue::Name(unquote(text).to_owned()),
        PropertyKind::ObjectRef { .. }
        | PropertyKind::ClassRef { .. }
        | PropertyKind::WeakObjectRef { .. }
        | PropertyKind::InterfaceRef { .. }
        | PropertyKind::SoftObjectRef { .. } => {
            if !is_null_text(text) {
                return Err(malformed());
            }
            match kind {
                PropertyKind::SoftObjectRef { .. } => {
                    NativeValue::SoftObject(SoftObjectPtr::default())
                }
                _ => NativeValue::default_for(kind),
            }
        }
        PropertyKind::Array(element) => {
            let inner = text
                .strip_prefix('(')
                .and_then(|rest| rest.strip_suffix(')'))
                .ok_or_else(malformed)?;
            let values = inner
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(|item| import_text(element, item, enums))
                .collect::<Result<Vec<_>, _>>()?;
            NativeValue::Array(NativeArray::from_values(element, values))
        }
        PropertyKind::Map(_, _)
        | PropertyKind::Set(_)
        | PropertyKind::Struct { .. }
        | PropertyKind::Delegate(_)
        | PropertyKind::MulticastDelegate(_) => {
            return Err(ImportTextError::Unsupported { kind: kind.name() });
        }
    })
}

fn parse_integer(text: &str) -> Option<i128> {
    text.parse::<i128>().ok()
}

fn parse_float(text: &str) -> Option<f64> {
    let text = text.strip_suffix(['f', 'F']).unwrap_or(text);
    text.parse::<f64>().ok()
}

fn unquote(text: &str) -> &str {
    text.strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(text)
}

fn is_null_text(text: &str) -> bool {
    matches!(text, "" | "None" | "none" | "nullptr")
}

fn import_enum(
    enum_type: TypeHash,
    underlying: EnumUnderlying,
    text: &str,
    enums: Option<&dyn EnumLookup>,
) -> Result<i64, ImportTextError> {
    if let Some(value) = parse_integer(text) {
        return Ok(underlying.truncate(value as i64));
    }
    let name = text.rsplit_once("::").map_or(text, |(_, name)| name);
    enums
        .and_then(|lookup| lookup.enumerator_value(enum_type, name))
        .map(|value| underlying.truncate(value))
        .ok_or_else(|| ImportTextError::UnknownEnumerator {
            text: text.to_owned(),
        })
}
