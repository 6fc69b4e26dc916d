use scriptbridge_core::{NativeFunction, PropertyBuffer};
use tracing::trace;

use crate::InvocationError;
use crate::logging::TARGET;

/// Parameter block for one native call.
///
/// Slots start zeroed; every parameter that is not safely zero-valued is
/// initialized on construction. Teardown destroys each slot once, whether the
/// call succeeded, failed, or never happened.
pub struct NativeCallFrame<'f> {
    function: &'f NativeFunction,
    buffer: PropertyBuffer,
    torn_down: bool,
}

impl<'f> NativeCallFrame<'f> {
    pub fn new(function: &'f NativeFunction) -> Result<Self, InvocationError> {
        let size = function.parms_size();
        let mut frame = Self {
            function,
            buffer: PropertyBuffer::zeroed(size),
            torn_down: false,
        };
        for param in function.params() {
            if param.index >= size {
                return Err(InvocationError::ParameterOutOfBounds {
                    function: function.name().to_owned(),
                    parameter: param.name.clone(),
                });
            }
            if !param.is_zero_constructor() {
                frame.buffer.initialize_value(param);
            }
        }
        Ok(frame)
    }

    pub fn function(&self) -> &'f NativeFunction {
        self.function
    }

    pub fn buffer(&self) -> &PropertyBuffer {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut PropertyBuffer {
        &mut self.buffer
    }

    /// Destroy every parameter slot. Returns how many held storage.
    ///
    /// Only the first call does anything.
    pub fn teardown(&mut self) -> usize {
        if self.torn_down {
            return 0;
        }
        self.torn_down = true;
        let function = self.function;
        let buffer = &mut self.buffer;
        let destroyed = function
            .params()
            .iter()
            .filter(|param| buffer.destroy_value(param.index))
            .count();
        trace!(target: TARGET, function = function.name(), destroyed, "frame torn down");
        destroyed
    }
}

impl Drop for NativeCallFrame<'_> {
    fn drop(&mut self) {
        self.teardown();
    }
}
