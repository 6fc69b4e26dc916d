//! Marshaling between a dynamic scripting runtime and a reflected native
//! object model.
//!
//! - [`PropertyConverter`] converts values between script values and native
//!   slots, driven by [`PropertyKind`](scriptbridge_core::PropertyKind).
//! - [`ObjectProxyCache`] keeps one [`ObjectProxy`] per live native object.
//! - [`InvocationGateway`] calls native functions with script arguments,
//!   releasing the [`ExclusivityLock`] around the native body.
//! - [`EventBinder`] binds scripted callables to native events through
//!   [`DelegateBridgeHandle`]s.
//! - [`ScriptRuntime`] ties these together and exposes the attribute protocol
//!   scripts see on a proxy.
//!
//! ```
//! use std::sync::Arc;
//!
//! use scriptbridge::{ScriptRuntime, ScriptValue};
//! use scriptbridge_core::{NativeClass, ObjectHeap, PropertyKind};
//! use scriptbridge_registry::NativeRegistry;
//!
//! let actor = NativeClass::builder("Actor")
//!     .property("Health", PropertyKind::Int32)
//!     .build();
//! let heap = Arc::new(ObjectHeap::new());
//! let runtime = ScriptRuntime::new(Arc::clone(&heap), NativeRegistry::new());
//!
//! let hero = runtime.wrap(heap.spawn(&actor, "hero")).unwrap();
//! runtime.set_attribute(&hero, "Health", ScriptValue::Int(40)).unwrap();
//! assert_eq!(runtime.get_attribute(&hero, "Health").unwrap(), ScriptValue::Int(40));
//! ```

// Configuration and errors
mod config;
pub use config::{BridgeConfig, DelegateReturnPolicy};

mod error;
pub use error::{
    BindingError, BridgeError, ConversionError, InvocationError, Result, ScriptError,
    ScriptErrorKind,
};

mod logging;
pub use logging::log_script_error;

// Concurrency
mod lock;
pub use lock::{ExclusiveGuard, ExclusivityLock};

// Script-side values
mod value;
pub use value::{
    CallArgs, DelegateProperty, ScriptCallable, ScriptClass, ScriptDict, ScriptFunction, ScriptKey,
    ScriptSet, ScriptValue,
};

// Proxies
mod proxy;
pub use proxy::{ObjectProxy, ObjectProxyCache};

// Conversion
mod convert;
pub use convert::{PropertyConverter, StructConverter, StructConverters};

// Calls into native code
mod invoke;
pub use invoke::{InvocationGateway, NativeCallFrame};

// Native events
mod delegate;
pub use delegate::{DelegateBridgeHandle, DelegateRegistry, EventBinder};

// Runtime
mod runtime;
pub use runtime::{BoundNativeMethod, ScriptRuntime};
