//! Native reflected object model for scriptbridge.
//!
//! This crate provides the native side the marshaling layer operates on:
//! - Type hashes and property descriptors
//! - Slot storage (`NativeValue`, `PropertyBuffer`) and native containers
//! - Reflected classes, functions and their call context
//! - Single-cast and multicast delegates
//! - Default-value text import
//! - A generational object heap with rooting and destruction listeners

// Identity
mod type_hash;
pub use type_hash::{TypeHash, hash_constants};

// Descriptors and signatures
mod descriptor;
pub use descriptor::{EnumUnderlying, KindTag, PropertyDescriptor, PropertyFlags, PropertyKind};

mod signature;
pub use signature::FunctionSignature;

// Slot storage
mod value;
pub use value::{NativeValue, SoftObjectPtr};

mod buffer;
pub use buffer::PropertyBuffer;

mod containers;
pub use containers::{NativeArray, NativeMap, NativeSet, NativeStruct};

// Error types
mod error;
pub use error::{ImportTextError, NativeError};

// Typed slot access
mod convert;
pub use convert::{FromNative, IntoNative};

// Events
mod delegate;
pub use delegate::{
    BroadcastResult, EventError, FnEventTarget, MulticastScriptDelegate, NativeEventTarget,
    ScriptDelegate,
};

// Classes and functions
mod class;
pub use class::{ClassBuilder, ClassFlags, METACLASS_NAME, NativeClass};

mod function;
pub use function::{CallContext, NativeCallable, NativeFn, NativeFunction};

// Default values
mod text_import;
pub use text_import::{EnumLookup, import_text};

// Object lifetime
mod heap;
pub use heap::{NativeObject, ObjectHandle, ObjectHeap, ObjectListener};
