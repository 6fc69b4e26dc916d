//! Native events delivered to scripted callables.
//!
//! A [`DelegateBridgeHandle`] is the native event target registered on a
//! delegate property. When the native side fires, the handle takes the
//! exclusivity lock, converts the arguments, calls the scripted callable and
//! contains whatever goes wrong. [`EventBinder`] creates the bindings, either
//! one at a time, from event annotations on a scripted class, or by naming
//! convention.

mod binder;
mod bridge;
mod registry;

pub use binder::EventBinder;
pub use bridge::DelegateBridgeHandle;
pub use registry::DelegateRegistry;
