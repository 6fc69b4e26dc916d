//! Slot buffers addressed by descriptor index.

use crate::{NativeValue, PropertyDescriptor, PropertyKind};

/// A block of native slots: an object's property storage or a call frame.
#[derive(Debug, Clone, Default)]
pub struct PropertyBuffer {
    slots: Vec<NativeValue>,
}

impl PropertyBuffer {
    /// A buffer of `size` zeroed slots.
    pub fn zeroed(size: usize) -> Self {
        Self {
            slots: vec![NativeValue::Zeroed; size],
        }
    }

    /// A buffer laid out for `properties`, with every slot initialized.
    pub fn for_layout(properties: &[PropertyDescriptor]) -> Self {
        let size = properties.iter().map(|p| p.index + 1).max().unwrap_or(0);
        let mut buffer = Self::zeroed(size);
        for property in properties {
            buffer.initialize_value(property);
        }
        buffer
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&NativeValue> {
        self.slots.get(index)
    }

    /// Raw mutable access. The slot may still be `Zeroed`.
    pub fn slot_mut(&mut self, index: usize) -> Option<&mut NativeValue> {
        self.slots.get_mut(index)
    }

    /// Mutable access with the slot materialized as `kind`.
    pub fn value_mut(&mut self, index: usize, kind: &PropertyKind) -> Option<&mut NativeValue> {
        self.slots.get_mut(index).map(|slot| slot.materialize(kind))
    }

    pub fn set(&mut self, index: usize, value: NativeValue) -> bool {
        match self.slots.get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Put the default of the descriptor's kind into its slot.
    pub fn initialize_value(&mut self, property: &PropertyDescriptor) -> bool {
        self.set(property.index, NativeValue::default_for(&property.kind))
    }

    /// Release the slot's storage and return it to the zeroed state.
    ///
    /// Returns true if the slot held storage that needed destruction.
    pub fn destroy_value(&mut self, index: usize) -> bool {
        match self.slots.get_mut(index) {
            Some(slot) => {
                let destroyed = slot.needs_destroy();
                *slot = NativeValue::Zeroed;
                destroyed
            }
            None => false,
        }
    }

    /// Number of slots currently holding storage that needs destruction.
    pub fn live_storage_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.needs_destroy()).count()
    }
}
