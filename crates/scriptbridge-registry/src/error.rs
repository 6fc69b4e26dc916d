use thiserror::Error;

/// Errors raised while registering native types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    /// A referenced type was not found.
    #[error("type not found: {0}")]
    TypeNotFound(String),

    /// A type with this name already exists.
    #[error("duplicate type: {0}")]
    DuplicateType(String),

    /// A duplicate enumerator was registered.
    #[error("duplicate enum value: '{value_name}' in enum '{enum_name}'")]
    DuplicateEnumValue { enum_name: String, value_name: String },
}
