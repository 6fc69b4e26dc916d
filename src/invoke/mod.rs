//! Calling native functions from scripts.
//!
//! [`InvocationGateway::call`] marshals script arguments into a
//! [`NativeCallFrame`], runs the native body with the exclusivity lock
//! released, and converts the return value and out-params back.

mod frame;
mod gateway;

pub use frame::NativeCallFrame;
pub use gateway::InvocationGateway;
