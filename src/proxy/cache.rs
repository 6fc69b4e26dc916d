use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use scriptbridge_core::{ObjectHandle, ObjectHeap};
use tracing::debug;

use crate::logging::TARGET;
use crate::{ObjectProxy, ScriptValue};

/// Identity map from native objects to their proxies.
///
/// Holds at most one live proxy per live native object. Entries are `Weak`,
/// so a proxy dies with its last scripting owner and is recreated on the next
/// lookup. Native destruction evicts and invalidates the entry.
///
/// Lock order: the entry map is locked before the heap is consulted.
pub struct ObjectProxyCache {
    heap: Arc<ObjectHeap>,
    entries: Mutex<FxHashMap<ObjectHandle, Weak<ObjectProxy>>>,
}

impl ObjectProxyCache {
    pub fn new(heap: Arc<ObjectHeap>) -> Self {
        Self {
            heap,
            entries: Mutex::new(FxHashMap::default()),
        }
    }

    /// Return the proxy for `handle`, creating it if the object is alive.
    ///
    /// Returns `None` without creating anything when the object is gone.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn get_or_create(&self, handle: ObjectHandle) -> Option<Arc<ObjectProxy>> {
        let mut entries = self.entries.lock();
        if let Some(existing) = entries.get(&handle).and_then(Weak::upgrade) {
            if existing.is_valid() && self.heap.is_alive(handle) {
                return Some(existing);
            }
            existing.invalidate();
            entries.remove(&handle);
            return None;
        }

        let object = self.heap.get(handle)?;
        let proxy = Arc::new(ObjectProxy::new(&object, Arc::downgrade(&self.heap)));
        entries.insert(handle, Arc::downgrade(&proxy));
        debug!(target: TARGET, %handle, name = object.name(), "created proxy");
        Some(proxy)
    }

    /// Like [`get_or_create`](Self::get_or_create), handing the new reference
    /// to the scripting runtime as a value. A dead object yields `None`.
    pub fn get_or_create_retained(&self, handle: ObjectHandle) -> ScriptValue {
        self.get_or_create(handle)
            .map_or(ScriptValue::None, ScriptValue::Object)
    }

    /// Recognize a proxy in an arbitrary script value.
    pub fn is_proxy(value: &ScriptValue) -> Option<&Arc<ObjectProxy>> {
        value.as_object()
    }

    /// Drop the entry for a destroyed object and invalidate its proxy.
    pub fn evict(&self, handle: ObjectHandle) -> bool {
        let removed = self.entries.lock().remove(&handle);
        match removed.and_then(|weak| weak.upgrade()) {
            Some(proxy) => {
                proxy.invalidate();
                debug!(target: TARGET, %handle, "evicted proxy");
                true
            }
            None => false,
        }
    }

    /// Number of entries, dead ones included until [`purge`](Self::purge).
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Whether a live proxy is recorded for `handle`.
    pub fn contains(&self, handle: ObjectHandle) -> bool {
        self.entries
            .lock()
            .get(&handle)
            .is_some_and(|weak| weak.strong_count() > 0)
    }

    /// Drop entries whose proxy has died. Returns how many were dropped.
    ///
    /// The runtime purges whenever a native object is destroyed.
    pub fn purge(&self) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, weak| weak.strong_count() > 0);
        let purged = before - entries.len();
        if purged > 0 {
            debug!(target: TARGET, purged, "purged dead proxy entries");
        }
        purged
    }

    pub fn heap(&self) -> &Arc<ObjectHeap> {
        &self.heap
    }
}
