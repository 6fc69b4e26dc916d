//! The dynamic runtime's value model.
//!
//! [`ScriptValue`] is what scripted code sees: numbers, strings, byte
//! buffers, sequences, mappings, sets, object proxies, callables and
//! delegate-property handles. Integers are `i128` so every native 64-bit
//! value, signed or not, fits without loss.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use ordered_float::OrderedFloat;
use rustc_hash::{FxHashMap, FxHashSet};
use scriptbridge_core::FunctionSignature;

use crate::{ConversionError, ObjectProxy, ScriptError};

/// A value in the scripting runtime.
#[derive(Clone, Default)]
pub enum ScriptValue {
    #[default]
    None,
    Bool(bool),
    Int(i128),
    Float(f64),
    Str(String),
    /// Immutable byte buffer.
    Bytes(Vec<u8>),
    /// Mutable byte buffer.
    ByteArray(Vec<u8>),
    List(Vec<ScriptValue>),
    Tuple(Vec<ScriptValue>),
    Dict(ScriptDict),
    Set(ScriptSet),
    Object(Arc<ObjectProxy>),
    Callable(Arc<dyn ScriptCallable>),
    Property(DelegateProperty),
}

impl ScriptValue {
    pub fn str(value: impl Into<String>) -> Self {
        ScriptValue::Str(value.into())
    }

    pub fn callable(callable: impl ScriptCallable + 'static) -> Self {
        ScriptValue::Callable(Arc::new(callable))
    }

    /// Name of the value's category as scripts would report it.
    pub fn type_name(&self) -> &'static str {
        match self {
            ScriptValue::None => "NoneType",
            ScriptValue::Bool(_) => "bool",
            ScriptValue::Int(_) => "int",
            ScriptValue::Float(_) => "float",
            ScriptValue::Str(_) => "str",
            ScriptValue::Bytes(_) => "bytes",
            ScriptValue::ByteArray(_) => "bytearray",
            ScriptValue::List(_) => "list",
            ScriptValue::Tuple(_) => "tuple",
            ScriptValue::Dict(_) => "dict",
            ScriptValue::Set(_) => "set",
            ScriptValue::Object(_) => "object",
            ScriptValue::Callable(_) => "function",
            ScriptValue::Property(_) => "delegate property",
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, ScriptValue::None)
    }

    /// Whether the value may be a dict key or set element.
    pub fn is_hashable(&self) -> bool {
        match self {
            ScriptValue::None
            | ScriptValue::Bool(_)
            | ScriptValue::Int(_)
            | ScriptValue::Float(_)
            | ScriptValue::Str(_)
            | ScriptValue::Bytes(_)
            | ScriptValue::Object(_)
            | ScriptValue::Callable(_) => true,
            ScriptValue::Tuple(items) => items.iter().all(ScriptValue::is_hashable),
            ScriptValue::ByteArray(_)
            | ScriptValue::List(_)
            | ScriptValue::Dict(_)
            | ScriptValue::Set(_)
            | ScriptValue::Property(_) => false,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ScriptValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i128> {
        match self {
            ScriptValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            ScriptValue::Float(value) => Some(*value),
            ScriptValue::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ScriptValue::Str(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Arc<ObjectProxy>> {
        match self {
            ScriptValue::Object(proxy) => Some(proxy),
            _ => None,
        }
    }

    pub fn as_callable(&self) -> Option<&Arc<dyn ScriptCallable>> {
        match self {
            ScriptValue::Callable(callable) => Some(callable),
            _ => None,
        }
    }

    /// Elements of a list or tuple.
    pub fn as_sequence(&self) -> Option<&[ScriptValue]> {
        match self {
            ScriptValue::List(items) | ScriptValue::Tuple(items) => Some(items),
            _ => None,
        }
    }
}

/// The integer a float equals exactly, if any.
fn integral_float(value: f64) -> Option<i128> {
    const LIMIT: f64 = 170_141_183_460_469_231_731_687_303_715_884_105_728.0; // 2^127
    (value.is_finite() && value.fract() == 0.0 && (-LIMIT..LIMIT).contains(&value))
        .then_some(value as i128)
}

impl PartialEq for ScriptValue {
    /// Value equality; objects and callables compare by identity, dicts and
    /// sets ignore order, and ints equal floats of exactly the same value.
    /// NaN equals itself so values can be hashed.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ScriptValue::None, ScriptValue::None) => true,
            (ScriptValue::Bool(a), ScriptValue::Bool(b)) => a == b,
            (ScriptValue::Int(a), ScriptValue::Int(b)) => a == b,
            (ScriptValue::Float(a), ScriptValue::Float(b)) => OrderedFloat(*a) == OrderedFloat(*b),
            (ScriptValue::Int(a), ScriptValue::Float(b))
            | (ScriptValue::Float(b), ScriptValue::Int(a)) => integral_float(*b) == Some(*a),
            (ScriptValue::Str(a), ScriptValue::Str(b)) => a == b,
            (
                ScriptValue::Bytes(a) | ScriptValue::ByteArray(a),
                ScriptValue::Bytes(b) | ScriptValue::ByteArray(b),
            ) => a == b,
            (ScriptValue::List(a), ScriptValue::List(b))
            | (ScriptValue::Tuple(a), ScriptValue::Tuple(b)) => a == b,
            (ScriptValue::Dict(a), ScriptValue::Dict(b)) => a == b,
            (ScriptValue::Set(a), ScriptValue::Set(b)) => a == b,
            (ScriptValue::Object(a), ScriptValue::Object(b)) => Arc::ptr_eq(a, b),
            (ScriptValue::Callable(a), ScriptValue::Callable(b)) => {
                callable_id(a) == callable_id(b)
            }
            (ScriptValue::Property(a), ScriptValue::Property(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for ScriptValue {}

impl Hash for ScriptValue {
    /// Consistent with `eq`: an integral float hashes as the equal int, and
    /// both byte buffer kinds hash alike. Dicts and sets only hash their
    /// length since they are never keys.
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            ScriptValue::None => 0u8.hash(state),
            ScriptValue::Bool(value) => {
                1u8.hash(state);
                value.hash(state);
            }
            ScriptValue::Int(value) => {
                2u8.hash(state);
                value.hash(state);
            }
            ScriptValue::Float(value) => match integral_float(*value) {
                Some(int) => {
                    2u8.hash(state);
                    int.hash(state);
                }
                None => {
                    3u8.hash(state);
                    OrderedFloat(*value).hash(state);
                }
            },
            ScriptValue::Str(value) => {
                4u8.hash(state);
                value.hash(state);
            }
            ScriptValue::Bytes(bytes) | ScriptValue::ByteArray(bytes) => {
                5u8.hash(state);
                bytes.hash(state);
            }
            ScriptValue::List(items) => {
                6u8.hash(state);
                items.hash(state);
            }
            ScriptValue::Tuple(items) => {
                7u8.hash(state);
                items.hash(state);
            }
            ScriptValue::Dict(dict) => {
                8u8.hash(state);
                dict.len().hash(state);
            }
            ScriptValue::Set(set) => {
                9u8.hash(state);
                set.len().hash(state);
            }
            ScriptValue::Object(proxy) => {
                10u8.hash(state);
                Arc::as_ptr(proxy).hash(state);
            }
            ScriptValue::Callable(callable) => {
                11u8.hash(state);
                callable_id(callable).hash(state);
            }
            ScriptValue::Property(property) => {
                12u8.hash(state);
                property.owner.as_ref().map(Arc::as_ptr).hash(state);
                property.property.hash(state);
            }
        }
    }
}

impl fmt::Debug for ScriptValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptValue::None => f.write_str("None"),
            ScriptValue::Bool(value) => write!(f, "{value}"),
            ScriptValue::Int(value) => write!(f, "{value}"),
            ScriptValue::Float(value) => write!(f, "{value:?}"),
            ScriptValue::Str(value) => write!(f, "{value:?}"),
            ScriptValue::Bytes(value) => write!(f, "b{value:?}"),
            ScriptValue::ByteArray(value) => write!(f, "bytearray({value:?})"),
            ScriptValue::List(items) => f.debug_list().entries(items).finish(),
            ScriptValue::Tuple(items) => {
                let mut tuple = f.debug_tuple("");
                for item in items {
                    tuple.field(item);
                }
                tuple.finish()
            }
            ScriptValue::Dict(dict) => f.debug_map().entries(dict.iter()).finish(),
            ScriptValue::Set(set) => f.debug_set().entries(set.iter()).finish(),
            ScriptValue::Object(proxy) => {
                write!(f, "<{} '{}'>", proxy.class().name(), proxy.name())
            }
            ScriptValue::Callable(callable) => write!(f, "<function {}>", callable.name()),
            ScriptValue::Property(property) => fmt::Debug::fmt(property, f),
        }
    }
}

impl From<bool> for ScriptValue {
    fn from(value: bool) -> Self {
        ScriptValue::Bool(value)
    }
}

macro_rules! impl_from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for ScriptValue {
                fn from(value: $ty) -> Self {
                    ScriptValue::Int(value as i128)
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32, u64, i128, usize);

impl From<f32> for ScriptValue {
    fn from(value: f32) -> Self {
        ScriptValue::Float(f64::from(value))
    }
}

impl From<f64> for ScriptValue {
    fn from(value: f64) -> Self {
        ScriptValue::Float(value)
    }
}

impl From<&str> for ScriptValue {
    fn from(value: &str) -> Self {
        ScriptValue::Str(value.to_owned())
    }
}

impl From<String> for ScriptValue {
    fn from(value: String) -> Self {
        ScriptValue::Str(value)
    }
}

impl From<Arc<ObjectProxy>> for ScriptValue {
    fn from(proxy: Arc<ObjectProxy>) -> Self {
        ScriptValue::Object(proxy)
    }
}

impl<T: Into<ScriptValue>> From<Vec<T>> for ScriptValue {
    fn from(items: Vec<T>) -> Self {
        ScriptValue::List(items.into_iter().map(Into::into).collect())
    }
}

// ============================================================================
// Dict and set
// ============================================================================

fn check_hashable(key: &ScriptValue) -> Result<(), ConversionError> {
    if key.is_hashable() {
        Ok(())
    } else {
        Err(ConversionError::UnhashableKey {
            value: key.type_name(),
        })
    }
}

/// Values that are always valid dict keys and set elements, so collections
/// can be collected from them without a fallible insert.
pub trait ScriptKey: Into<ScriptValue> {}

macro_rules! impl_script_key {
    ($($ty:ty),*) => {
        $(impl ScriptKey for $ty {})*
    };
}

impl_script_key!(bool, i8, i16, i32, i64, u8, u16, u32, u64, i128, usize, f32, f64, &str, String);

/// Unordered mapping with hashable keys. Equality ignores entry order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScriptDict {
    entries: FxHashMap<ScriptValue, ScriptValue>,
}

impl ScriptDict {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace. Returns the previous value for the key.
    pub fn insert(
        &mut self,
        key: ScriptValue,
        value: ScriptValue,
    ) -> Result<Option<ScriptValue>, ConversionError> {
        check_hashable(&key)?;
        Ok(self.entries.insert(key, value))
    }

    pub fn get(&self, key: &ScriptValue) -> Option<&ScriptValue> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ScriptValue, &ScriptValue)> {
        self.entries.iter()
    }
}

impl<K: ScriptKey, V: Into<ScriptValue>> FromIterator<(K, V)> for ScriptDict {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

/// Unordered set of distinct hashable values.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScriptSet {
    items: FxHashSet<ScriptValue>,
}

impl ScriptSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value. Returns false if an equal value was present.
    pub fn insert(&mut self, value: ScriptValue) -> Result<bool, ConversionError> {
        check_hashable(&value)?;
        Ok(self.items.insert(value))
    }

    pub fn contains(&self, value: &ScriptValue) -> bool {
        self.items.contains(value)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScriptValue> {
        self.items.iter()
    }
}

impl<T: ScriptKey> FromIterator<T> for ScriptSet {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().map(Into::into).collect(),
        }
    }
}

// ============================================================================
// Callables
// ============================================================================

/// Something scripted code can call.
pub trait ScriptCallable: Send + Sync {
    fn name(&self) -> &str;

    fn call(&self, args: &[ScriptValue]) -> Result<ScriptValue, ScriptError>;

    /// An attribute attached to the callable, such as an event annotation.
    fn attribute(&self, _name: &str) -> Option<ScriptValue> {
        None
    }
}

pub(crate) fn callable_id(callable: &Arc<dyn ScriptCallable>) -> *const () {
    Arc::as_ptr(callable) as *const ()
}

type ScriptBody = dyn Fn(&[ScriptValue]) -> Result<ScriptValue, ScriptError> + Send + Sync;

/// A scripted function backed by a Rust closure.
pub struct ScriptFunction {
    name: String,
    attributes: FxHashMap<String, ScriptValue>,
    body: Box<ScriptBody>,
}

impl ScriptFunction {
    pub fn new<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&[ScriptValue]) -> Result<ScriptValue, ScriptError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            attributes: FxHashMap::default(),
            body: Box::new(body),
        }
    }

    pub fn with_attribute(
        mut self,
        name: impl Into<String>,
        value: impl Into<ScriptValue>,
    ) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn shared(self) -> Arc<dyn ScriptCallable> {
        Arc::new(self)
    }
}

impl ScriptCallable for ScriptFunction {
    fn name(&self) -> &str {
        &self.name
    }

    fn call(&self, args: &[ScriptValue]) -> Result<ScriptValue, ScriptError> {
        (self.body)(args).map_err(|err| err.with_frame(self.name.clone()))
    }

    fn attribute(&self, name: &str) -> Option<ScriptValue> {
        self.attributes.get(name).cloned()
    }
}

impl fmt::Debug for ScriptFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptFunction")
            .field("name", &self.name)
            .field("attributes", &self.attributes.len())
            .finish_non_exhaustive()
    }
}

/// A scripted class: an ordered set of named attributes.
#[derive(Clone, Debug, Default)]
pub struct ScriptClass {
    name: String,
    attributes: Vec<(String, ScriptValue)>,
}

impl ScriptClass {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a method under its own name.
    pub fn with_method(self, callable: Arc<dyn ScriptCallable>) -> Self {
        let name = callable.name().to_owned();
        self.with_attribute(name, ScriptValue::Callable(callable))
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: ScriptValue) -> Self {
        let name = name.into();
        match self.attributes.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = value,
            None => self.attributes.push((name, value)),
        }
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&ScriptValue> {
        self.attributes.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Callable attributes, sorted by attribute name.
    pub fn callables(&self) -> Vec<(&str, &Arc<dyn ScriptCallable>)> {
        let mut callables: Vec<_> = self
            .attributes
            .iter()
            .filter_map(|(name, value)| value.as_callable().map(|c| (name.as_str(), c)))
            .collect();
        callables.sort_by(|a, b| a.0.cmp(b.0));
        callables
    }
}

// ============================================================================
// Call arguments
// ============================================================================

/// Positional and named arguments of a scripted call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CallArgs {
    pub positional: Vec<ScriptValue>,
    pub named: Vec<(String, ScriptValue)>,
}

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn positional(values: impl IntoIterator<Item = ScriptValue>) -> Self {
        Self {
            positional: values.into_iter().collect(),
            named: Vec::new(),
        }
    }

    pub fn arg(mut self, value: impl Into<ScriptValue>) -> Self {
        self.positional.push(value.into());
        self
    }

    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<ScriptValue>) -> Self {
        self.named.push((name.into(), value.into()));
        self
    }

    pub fn named(&self, name: &str) -> Option<&ScriptValue> {
        self.named.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn has_named(&self, name: &str) -> bool {
        self.named(name).is_some()
    }
}

// ============================================================================
// Delegate-property handles
// ============================================================================

/// Opaque handle to a native delegate property.
///
/// Produced when scripted code reads an event property; the binding APIs
/// accept it. It cannot be called.
#[derive(Clone)]
pub struct DelegateProperty {
    owner: Option<Arc<ObjectProxy>>,
    property: String,
    signature: Arc<FunctionSignature>,
    multicast: bool,
}

impl DelegateProperty {
    pub(crate) fn new(
        owner: Option<Arc<ObjectProxy>>,
        property: impl Into<String>,
        signature: Arc<FunctionSignature>,
        multicast: bool,
    ) -> Self {
        Self {
            owner,
            property: property.into(),
            signature,
            multicast,
        }
    }

    /// The object the property belongs to; `None` for values not read off an object.
    pub fn owner(&self) -> Option<&Arc<ObjectProxy>> {
        self.owner.as_ref()
    }

    pub fn property(&self) -> &str {
        &self.property
    }

    pub fn signature(&self) -> &Arc<FunctionSignature> {
        &self.signature
    }

    pub fn is_multicast(&self) -> bool {
        self.multicast
    }
}

impl PartialEq for DelegateProperty {
    fn eq(&self, other: &Self) -> bool {
        let same_owner = match (&self.owner, &other.owner) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };
        same_owner && self.property == other.property
    }
}

impl fmt::Debug for DelegateProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DelegateProperty")
            .field("owner", &self.owner.as_ref().map(|o| o.name().to_owned()))
            .field("property", &self.property)
            .field("multicast", &self.multicast)
            .finish()
    }
}
