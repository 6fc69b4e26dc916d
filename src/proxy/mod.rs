//! Scripting-side proxies of native objects.
//!
//! An [`ObjectProxy`] is what scripted code holds when it refers to a native
//! object. It keeps a non-owning [`ObjectHandle`], so the native object may be
//! destroyed underneath it; the [`ObjectProxyCache`] invalidates the proxy when
//! that happens. Scripts may also hang their own attributes off a proxy in its
//! auxiliary store.

mod cache;
pub use cache::ObjectProxyCache;

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use scriptbridge_core::{NativeClass, NativeObject, ObjectHandle, ObjectHeap, TypeHash};

use crate::ScriptValue;

/// Scripting-visible handle to a native object.
pub struct ObjectProxy {
    handle: ObjectHandle,
    name: String,
    class: Arc<NativeClass>,
    represented_class: Option<Arc<NativeClass>>,
    attributes: Mutex<FxHashMap<String, ScriptValue>>,
    owned: AtomicBool,
    valid: AtomicBool,
    heap: Weak<ObjectHeap>,
}

impl ObjectProxy {
    pub(crate) fn new(object: &NativeObject, heap: Weak<ObjectHeap>) -> Self {
        Self {
            handle: object.handle(),
            name: object.name().to_owned(),
            class: Arc::clone(object.class()),
            represented_class: object.represented_class().cloned(),
            attributes: Mutex::new(FxHashMap::default()),
            owned: AtomicBool::new(false),
            valid: AtomicBool::new(true),
            heap,
        }
    }

    pub fn handle(&self) -> ObjectHandle {
        self.handle
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn class(&self) -> &Arc<NativeClass> {
        &self.class
    }

    /// The class a class object stands for.
    pub fn represented_class(&self) -> Option<&Arc<NativeClass>> {
        self.represented_class.as_ref()
    }

    /// Whether the native object is still alive as far as the proxy knows.
    pub fn is_valid(&self) -> bool {
        self.valid.load(Ordering::Acquire)
    }

    pub(crate) fn invalidate(&self) {
        self.valid.store(false, Ordering::Release);
    }

    /// Whether the object's class is `class` or derives from it.
    pub fn is_a(&self, class: TypeHash) -> bool {
        self.class.is_child_of(class)
    }

    pub fn implements(&self, interface: TypeHash) -> bool {
        self.class.implements_interface(interface)
    }

    /// Resolve the native object, if the proxy is valid and the object alive.
    pub fn native(&self) -> Option<Arc<NativeObject>> {
        if !self.is_valid() {
            return None;
        }
        self.heap.upgrade()?.get(self.handle)
    }

    pub fn is_owned(&self) -> bool {
        self.owned.load(Ordering::Acquire)
    }

    /// Take or give up ownership of the native object.
    ///
    /// An owning proxy roots the object so garbage collection skips it.
    /// Returns false if the object is gone.
    pub fn set_owned(&self, owned: bool) -> bool {
        let Some(heap) = self.heap.upgrade() else {
            return false;
        };
        if !self.is_valid() || !heap.is_alive(self.handle) {
            return false;
        }
        if self.owned.swap(owned, Ordering::AcqRel) != owned {
            if owned {
                heap.add_root(self.handle);
            } else {
                heap.remove_root(self.handle);
            }
        }
        true
    }

    // ==========================================================================
    // Auxiliary attribute store
    // ==========================================================================

    pub fn aux_attribute(&self, name: &str) -> Option<ScriptValue> {
        self.attributes.lock().get(name).cloned()
    }

    pub fn set_aux_attribute(&self, name: impl Into<String>, value: ScriptValue) {
        self.attributes.lock().insert(name.into(), value);
    }

    pub fn remove_aux_attribute(&self, name: &str) -> Option<ScriptValue> {
        self.attributes.lock().remove(name)
    }

    pub fn aux_attribute_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.attributes.lock().keys().cloned().collect();
        names.sort();
        names
    }
}

impl Drop for ObjectProxy {
    fn drop(&mut self) {
        if *self.owned.get_mut()
            && let Some(heap) = self.heap.upgrade()
        {
            heap.remove_root(self.handle);
        }
    }
}

impl fmt::Debug for ObjectProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectProxy")
            .field("handle", &self.handle)
            .field("name", &self.name)
            .field("class", &self.class.name())
            .field("valid", &self.is_valid())
            .field("owned", &self.is_owned())
            .finish()
    }
}
