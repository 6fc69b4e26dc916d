use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Weak};

use scriptbridge_core::{
    EventError, FunctionSignature, NativeEventTarget, ObjectHandle, PropertyBuffer,
};
use tracing::debug;

use crate::logging::{TARGET, log_contained_panic, log_script_error};
use crate::runtime::RuntimeInner;
use crate::{DelegateReturnPolicy, ScriptCallable, ScriptError, ScriptValue};

/// Native event target that forwards fires to a scripted callable.
///
/// Holds the runtime weakly; once the runtime is gone every fire is ignored
/// and reported as a failure.
pub struct DelegateBridgeHandle {
    target: ObjectHandle,
    callable: Arc<dyn ScriptCallable>,
    signature: Arc<FunctionSignature>,
    runtime: Weak<RuntimeInner>,
}

impl DelegateBridgeHandle {
    pub(crate) fn new(
        target: ObjectHandle,
        callable: Arc<dyn ScriptCallable>,
        signature: Arc<FunctionSignature>,
        runtime: Weak<RuntimeInner>,
    ) -> Self {
        Self {
            target,
            callable,
            signature,
            runtime,
        }
    }

    /// The object whose event this handle is bound to.
    pub fn target(&self) -> ObjectHandle {
        self.target
    }

    pub fn callable(&self) -> &Arc<dyn ScriptCallable> {
        &self.callable
    }

    pub fn signature(&self) -> &Arc<FunctionSignature> {
        &self.signature
    }

    fn dispatch(
        &self,
        runtime: &RuntimeInner,
        params: &mut PropertyBuffer,
    ) -> Result<(), ScriptError> {
        let converter = runtime.converter();
        let args = self
            .signature
            .in_params()
            .map(|param| converter.to_dynamic(param, params))
            .collect::<Result<Vec<ScriptValue>, _>>()?;

        let result = self.callable.call(&args)?;

        if runtime.config.delegate_returns == DelegateReturnPolicy::WriteBack
            && let Some(ret) = self.signature.return_param()
        {
            converter.from_dynamic(&result, ret, params)?;
        }
        Ok(())
    }
}

impl NativeEventTarget for DelegateBridgeHandle {
    fn receive(&self, params: &mut PropertyBuffer) -> Result<(), EventError> {
        let Some(runtime) = self.runtime.upgrade() else {
            debug!(target: TARGET, handler = self.callable.name(), "runtime gone, ignoring fire");
            return Err(EventError);
        };
        let _guard = runtime.lock.acquire();

        let outcome = if runtime.config.contain_panics {
            match catch_unwind(AssertUnwindSafe(|| self.dispatch(&runtime, params))) {
                Ok(outcome) => outcome,
                Err(payload) => {
                    log_contained_panic(self.callable.name(), payload.as_ref());
                    return Err(EventError);
                }
            }
        } else {
            self.dispatch(&runtime, params)
        };

        outcome.map_err(|err| {
            log_script_error(self.callable.name(), &err, runtime.config.log_backtraces);
            EventError
        })
    }
}

impl fmt::Debug for DelegateBridgeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DelegateBridgeHandle")
            .field("target", &self.target)
            .field("callable", &self.callable.name())
            .field("signature", &self.signature.name())
            .finish()
    }
}
