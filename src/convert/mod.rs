//! Conversion between script values and native slots.
//!
//! [`PropertyConverter`] has two inverse halves:
//!
//! - **ToDynamic** (`to_dynamic`, `value_to_dynamic`): read a native slot as a
//!   [`ScriptValue`], dispatching on the descriptor's [`PropertyKind`].
//! - **FromDynamic** (`from_dynamic`, `value_from_dynamic`): write a script
//!   value into a native slot, dispatching on the value's category crossed
//!   with the slot's kind.
//!
//! Object references go through the [`ObjectProxyCache`], so converting the
//! same native object twice yields the same proxy.
//!
//! [`PropertyKind`]: scriptbridge_core::PropertyKind

mod from_dynamic;
mod structs;
mod to_dynamic;

pub use structs::{StructConverter, StructConverters};

use scriptbridge_core::ObjectHeap;

use crate::ObjectProxyCache;

/// Converts between script values and native slots.
#[derive(Clone, Copy)]
pub struct PropertyConverter<'rt> {
    proxies: &'rt ObjectProxyCache,
    structs: &'rt StructConverters,
}

impl<'rt> PropertyConverter<'rt> {
    pub fn new(proxies: &'rt ObjectProxyCache, structs: &'rt StructConverters) -> Self {
        Self { proxies, structs }
    }

    pub fn proxies(&self) -> &'rt ObjectProxyCache {
        self.proxies
    }

    fn heap(&self) -> &'rt ObjectHeap {
        self.proxies.heap()
    }
}
