//! Error types for the native object model.

use thiserror::Error;

/// Errors raised by native function bodies and slot access.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NativeError {
    #[error("parameter '{name}' not found in '{function}'")]
    ParameterNotFound { function: String, name: String },

    #[error("function '{function}' has no return value")]
    NoReturnValue { function: String },

    #[error("property '{name}' not found on '{class}'")]
    PropertyNotFound { class: String, name: String },

    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("invalid 'this': {message}")]
    InvalidThis { message: String },

    #[error("{message}")]
    Failed { message: String },
}

impl NativeError {
    pub fn invalid_this(message: impl Into<String>) -> Self {
        NativeError::InvalidThis {
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        NativeError::Failed {
            message: message.into(),
        }
    }
}

/// Errors parsing textual default values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImportTextError {
    #[error("cannot parse '{text}' as {kind}")]
    Malformed { kind: &'static str, text: String },

    #[error("unknown enumerator '{text}'")]
    UnknownEnumerator { text: String },

    #[error("{kind} properties have no text form")]
    Unsupported { kind: &'static str },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages() {
        let err = NativeError::ParameterNotFound {
            function: "Tick".into(),
            name: "Delta".into(),
        };
        assert_eq!(err.to_string(), "parameter 'Delta' not found in 'Tick'");
        assert_eq!(NativeError::failed("boom").to_string(), "boom");

        let err = ImportTextError::Malformed {
            kind: "Int32",
            text: "abc".into(),
        };
        assert_eq!(err.to_string(), "cannot parse 'abc' as Int32");
    }
}
