//! Native calls from scripts: argument binding, super dispatch and result packing.

use std::sync::Arc;

use scriptbridge_core::{EnumLookup, NativeFunction, import_text};
use scriptbridge_registry::NativeRegistry;
use tracing::trace;

use super::NativeCallFrame;
use crate::logging::TARGET;
use crate::{
    BridgeConfig, CallArgs, ExclusiveGuard, InvocationError, ObjectProxy, PropertyConverter,
    ScriptValue,
};

/// Calls native functions with script arguments.
#[derive(Clone, Copy)]
pub struct InvocationGateway<'rt> {
    config: &'rt BridgeConfig,
    converter: PropertyConverter<'rt>,
    registry: &'rt NativeRegistry,
}

impl<'rt> InvocationGateway<'rt> {
    pub fn new(
        config: &'rt BridgeConfig,
        converter: PropertyConverter<'rt>,
        registry: &'rt NativeRegistry,
    ) -> Self {
        Self {
            config,
            converter,
            registry,
        }
    }

    /// Call `function` on the object behind `target`.
    ///
    /// The exclusivity lock `guard` proves is released for the duration of the
    /// native body and held again before any result is converted. A single
    /// result is returned as is; several are packed into a tuple, return value
    /// first, then observable out-params in declaration order.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn call(
        &self,
        guard: &ExclusiveGuard<'_>,
        target: &ObjectProxy,
        function: &Arc<NativeFunction>,
        args: &CallArgs,
    ) -> Result<ScriptValue, InvocationError> {
        let function = self.resolve_super(function, args)?;
        trace!(target: TARGET, function = function.name(), object = target.name(), "invoke");

        let this = target.native().ok_or_else(|| InvocationError::InvalidTarget {
            function: function.name().to_owned(),
        })?;

        let mut frame = NativeCallFrame::new(function)?;
        self.bind_arguments(&mut frame, args)?;

        let heap = self.converter.proxies().heap();
        guard
            .unlocked(|| function.invoke(&this, frame.buffer_mut(), heap))
            .map_err(|source| InvocationError::Native {
                function: function.name().to_owned(),
                source,
            })?;

        self.collect_results(&frame)
    }

    fn resolve_super<'f>(
        &self,
        function: &'f Arc<NativeFunction>,
        args: &CallArgs,
    ) -> Result<&'f Arc<NativeFunction>, InvocationError> {
        if !args.has_named(&self.config.super_keyword) {
            return Ok(function);
        }
        function.super_function().ok_or_else(|| InvocationError::NoSuperFunction {
            function: function.name().to_owned(),
        })
    }

    /// Fill in-params: the n-th takes the n-th positional argument, then a
    /// named one, then its declared default.
    fn bind_arguments(
        &self,
        frame: &mut NativeCallFrame<'_>,
        args: &CallArgs,
    ) -> Result<(), InvocationError> {
        let function = frame.function();
        let enums: &dyn EnumLookup = self.registry;

        for (position, param) in function.signature().in_params().enumerate() {
            let argument = args.positional.get(position).or_else(|| args.named(&param.name));
            match argument {
                Some(value) => {
                    self.converter
                        .from_dynamic(value, param, frame.buffer_mut())
                        .map_err(|source| InvocationError::ArgumentConversion {
                            function: function.name().to_owned(),
                            parameter: param.name.clone(),
                            source,
                        })?;
                }
                None => {
                    let Some(text) = function.default_text(&param.name) else {
                        continue;
                    };
                    let value = import_text(&param.kind, text, Some(enums)).map_err(|source| {
                        InvocationError::DefaultValue {
                            function: function.name().to_owned(),
                            parameter: param.name.clone(),
                            source,
                        }
                    })?;
                    frame.buffer_mut().set(param.index, value);
                }
            }
        }
        Ok(())
    }

    fn collect_results(&self, frame: &NativeCallFrame<'_>) -> Result<ScriptValue, InvocationError> {
        let function = frame.function();
        let signature = function.signature();
        let outputs = signature
            .return_param()
            .into_iter()
            .chain(signature.params().iter().filter(|param| param.is_observable_out()));

        let mut results = Vec::new();
        for param in outputs {
            let value = self.converter.to_dynamic(param, frame.buffer()).map_err(|source| {
                InvocationError::ResultConversion {
                    function: function.name().to_owned(),
                    parameter: param.name.clone(),
                    source,
                }
            })?;
            results.push(value);
        }

        Ok(match results.len() {
            0 => ScriptValue::None,
            1 => results.pop().unwrap_or_default(),
            _ => ScriptValue::Tuple(results),
        })
    }
}
