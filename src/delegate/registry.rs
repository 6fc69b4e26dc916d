use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use scriptbridge_core::{FunctionSignature, ObjectHandle};
use tracing::debug;

use super::DelegateBridgeHandle;
use crate::ScriptCallable;
use crate::logging::TARGET;
use crate::runtime::RuntimeInner;
use crate::value::callable_id;

type HandleKey = (ObjectHandle, usize);

/// Live bridge handles, one per (target object, callable).
pub struct DelegateRegistry {
    runtime: Weak<RuntimeInner>,
    handles: Mutex<FxHashMap<HandleKey, Arc<DelegateBridgeHandle>>>,
}

impl DelegateRegistry {
    pub(crate) fn new(runtime: Weak<RuntimeInner>) -> Self {
        Self {
            runtime,
            handles: Mutex::new(FxHashMap::default()),
        }
    }

    /// Reuse the handle for (`target`, `callable`), or create one.
    ///
    /// A recorded handle with a different signature is replaced.
    pub fn find_or_add(
        &self,
        target: ObjectHandle,
        callable: &Arc<dyn ScriptCallable>,
        signature: &Arc<FunctionSignature>,
    ) -> Arc<DelegateBridgeHandle> {
        let key = (target, callable_id(callable) as usize);
        let mut handles = self.handles.lock();
        if let Some(existing) = handles.get(&key)
            && existing.signature() == signature
        {
            return Arc::clone(existing);
        }

        let handle = Arc::new(DelegateBridgeHandle::new(
            target,
            Arc::clone(callable),
            Arc::clone(signature),
            self.runtime.clone(),
        ));
        handles.insert(key, Arc::clone(&handle));
        debug!(target: TARGET, %target, handler = callable.name(), "created delegate handle");
        handle
    }

    /// Drop every handle bound to `target`. Returns how many were dropped.
    pub fn release_target(&self, target: ObjectHandle) -> usize {
        let mut handles = self.handles.lock();
        let before = handles.len();
        handles.retain(|(object, _), _| *object != target);
        let released = before - handles.len();
        if released > 0 {
            debug!(target: TARGET, %target, released, "released delegate handles");
        }
        released
    }

    /// Number of handles bound to `target`.
    pub fn handles_for(&self, target: ObjectHandle) -> usize {
        self.handles.lock().keys().filter(|(object, _)| *object == target).count()
    }

    pub fn len(&self) -> usize {
        self.handles.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.lock().is_empty()
    }
}
