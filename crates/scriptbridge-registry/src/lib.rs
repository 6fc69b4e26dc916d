//! scriptbridge type registry.
//!
//! Holds the native classes, enums and structs a runtime knows about, with
//! lookup by name and by [`TypeHash`](scriptbridge_core::TypeHash).

mod error;
pub use error::RegistrationError;

mod registry;
pub use registry::{EnumInfo, NativeRegistry, StructInfo};
