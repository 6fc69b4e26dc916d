//! Error types for the bridge.
//!
//! - [`ConversionError`]: a script value and a native kind do not fit together
//! - [`InvocationError`]: a native call could not be made or completed
//! - [`BindingError`]: a scripted callable could not be bound to a native event
//! - [`BridgeError`]: umbrella over all of the above
//! - [`ScriptError`]: the error value the scripting runtime raises

use std::fmt;

use scriptbridge_core::{ImportTextError, NativeError};
use scriptbridge_registry::RegistrationError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BridgeError>;

/// A value could not be converted to or from a native slot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    #[error("cannot convert {value} to {kind}")]
    Mismatch { value: &'static str, kind: String },

    #[error("{kind} properties are not convertible")]
    Unsupported { kind: String },

    #[error("object of class '{class}' is not assignable to {kind}")]
    NotAssignable { class: String, kind: String },

    #[error("object '{object}' is not a class")]
    NotAClass { object: String },

    #[error("proxy refers to a destroyed native object")]
    InvalidProxy,

    #[error("unhashable key of type {value}")]
    UnhashableKey { value: &'static str },

    #[error("no slot at index {index}")]
    MissingSlot { index: usize },

    #[error("no converter registered for struct {struct_type}")]
    StructUnsupported { struct_type: String },

    #[error("struct conversion failed: {message}")]
    Struct { message: String },
}

/// A native function call failed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvocationError {
    #[error("'{function}' has no super implementation")]
    NoSuperFunction { function: String },

    #[error("parameter '{parameter}' of '{function}' lies outside its parameter block")]
    ParameterOutOfBounds { function: String, parameter: String },

    #[error("argument '{parameter}' of '{function}': {source}")]
    ArgumentConversion {
        function: String,
        parameter: String,
        #[source]
        source: ConversionError,
    },

    #[error("default value of '{parameter}' in '{function}': {source}")]
    DefaultValue {
        function: String,
        parameter: String,
        #[source]
        source: ImportTextError,
    },

    #[error("cannot call '{function}' on a destroyed object")]
    InvalidTarget { function: String },

    #[error("'{class}' has no function '{name}'")]
    FunctionNotFound { class: String, name: String },

    #[error("'{function}' failed: {source}")]
    Native {
        function: String,
        #[source]
        source: NativeError,
    },

    #[error("result '{parameter}' of '{function}': {source}")]
    ResultConversion {
        function: String,
        parameter: String,
        #[source]
        source: ConversionError,
    },
}

/// A scripted callable could not be bound to a native event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindingError {
    #[error("'{class}' has no event '{event}'")]
    EventNotFound { class: String, event: String },

    #[error("'{property}' on '{class}' is not an event")]
    NotAnEvent { class: String, property: String },

    #[error("'{owner}' has no component '{component}'")]
    ComponentNotFound { owner: String, component: String },

    #[error("'{callable}' has malformed event annotation '{annotation}'")]
    InvalidAnnotation { callable: String, annotation: String },

    #[error("event annotation on '{callable}' is not a string")]
    AnnotationNotString { callable: String },

    #[error("cannot bind to a destroyed or detached object")]
    InvalidTarget,

    #[error("{} event bindings failed", .0.len())]
    Multiple(Vec<BindingError>),
}

/// Top-level bridge error.
#[derive(Debug, Clone, Error)]
pub enum BridgeError {
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error(transparent)]
    Invocation(#[from] InvocationError),

    #[error(transparent)]
    Binding(#[from] BindingError),

    #[error(transparent)]
    Native(#[from] NativeError),

    #[error(transparent)]
    Registration(#[from] RegistrationError),

    #[error(transparent)]
    Script(#[from] ScriptError),

    #[error("'{class}' object has no attribute '{name}'")]
    AttributeNotFound { class: String, name: String },

    #[error("native object has been destroyed")]
    InvalidProxy,
}

// ============================================================================
// Script-side errors
// ============================================================================

/// Category of a raised scripting error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptErrorKind {
    TypeError,
    ValueError,
    AttributeError,
    RuntimeError,
}

impl fmt::Display for ScriptErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScriptErrorKind::TypeError => "TypeError",
            ScriptErrorKind::ValueError => "ValueError",
            ScriptErrorKind::AttributeError => "AttributeError",
            ScriptErrorKind::RuntimeError => "RuntimeError",
        };
        f.write_str(name)
    }
}

/// An error raised inside the scripting runtime.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct ScriptError {
    pub kind: ScriptErrorKind,
    pub message: String,
    /// Frames the error passed through, innermost first.
    pub backtrace: Vec<String>,
}

impl ScriptError {
    pub fn new(kind: ScriptErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            backtrace: Vec::new(),
        }
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(ScriptErrorKind::TypeError, message)
    }

    pub fn value_error(message: impl Into<String>) -> Self {
        Self::new(ScriptErrorKind::ValueError, message)
    }

    pub fn attribute_error(message: impl Into<String>) -> Self {
        Self::new(ScriptErrorKind::AttributeError, message)
    }

    pub fn runtime_error(message: impl Into<String>) -> Self {
        Self::new(ScriptErrorKind::RuntimeError, message)
    }

    /// Append a frame to the backtrace.
    pub fn with_frame(mut self, frame: impl Into<String>) -> Self {
        self.backtrace.push(frame.into());
        self
    }
}

impl From<ConversionError> for ScriptError {
    fn from(err: ConversionError) -> Self {
        ScriptError::type_error(err.to_string())
    }
}

impl From<InvocationError> for ScriptError {
    fn from(err: InvocationError) -> Self {
        match err {
            InvocationError::ArgumentConversion { .. }
            | InvocationError::ResultConversion { .. } => ScriptError::type_error(err.to_string()),
            InvocationError::FunctionNotFound { .. } => {
                ScriptError::attribute_error(err.to_string())
            }
            _ => ScriptError::runtime_error(err.to_string()),
        }
    }
}

impl From<BindingError> for ScriptError {
    fn from(err: BindingError) -> Self {
        ScriptError::runtime_error(err.to_string())
    }
}

impl From<BridgeError> for ScriptError {
    fn from(err: BridgeError) -> Self {
        match err {
            BridgeError::Conversion(err) => err.into(),
            BridgeError::Invocation(err) => err.into(),
            BridgeError::Binding(err) => err.into(),
            BridgeError::Script(err) => err,
            err @ BridgeError::AttributeNotFound { .. } => {
                ScriptError::attribute_error(err.to_string())
            }
            err => ScriptError::runtime_error(err.to_string()),
        }
    }
}
