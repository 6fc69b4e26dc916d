//! Generational arena of native objects.
//!
//! Objects are addressed by [`ObjectHandle`]. Destroying an object bumps its
//! slot generation, so stale handles stop resolving instead of aliasing a
//! new occupant. Listeners registered with [`ObjectHeap::add_listener`] hear
//! about every destruction after the heap lock is released.
//!
//! Each slot carries a root count. Objects spawned normally start rooted;
//! [`ObjectHeap::collect_garbage`] destroys every object whose root count is zero.

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::{
    BroadcastResult, NativeClass, NativeError, NativeValue, PropertyBuffer, PropertyDescriptor,
    TypeHash,
};

/// Handle to a native object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectHandle {
    /// Index into the heap's slot table
    pub index: u32,
    /// Generation for use-after-free detection
    pub generation: u32,
}

impl ObjectHandle {
    pub fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }
}

impl fmt::Display for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

/// Notified when native objects are destroyed.
pub trait ObjectListener: Send + Sync {
    fn on_object_destroyed(&self, handle: ObjectHandle);
}

/// A live native object.
pub struct NativeObject {
    handle: ObjectHandle,
    name: String,
    class: Arc<NativeClass>,
    outer: Option<ObjectHandle>,
    represented_class: Option<Arc<NativeClass>>,
    properties: RwLock<PropertyBuffer>,
}

impl NativeObject {
    pub fn handle(&self) -> ObjectHandle {
        self.handle
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn class(&self) -> &Arc<NativeClass> {
        &self.class
    }

    pub fn outer(&self) -> Option<ObjectHandle> {
        self.outer
    }

    /// The class this object stands for, if it is a class object.
    pub fn represented_class(&self) -> Option<&Arc<NativeClass>> {
        self.represented_class.as_ref()
    }

    pub fn is_a(&self, class: TypeHash) -> bool {
        self.class.is_child_of(class)
    }

    /// Run `f` with shared access to the property buffer.
    pub fn read_properties<R>(&self, f: impl FnOnce(&PropertyBuffer) -> R) -> R {
        f(&self.properties.read())
    }

    /// Run `f` with exclusive access to the property buffer.
    pub fn write_properties<R>(&self, f: impl FnOnce(&mut PropertyBuffer) -> R) -> R {
        f(&mut self.properties.write())
    }

    /// Clone a property value out by name.
    pub fn property(&self, name: &str) -> Option<NativeValue> {
        let descriptor = self.class.find_property(name)?;
        self.read_properties(|buffer| buffer.get(descriptor.index).cloned())
    }

    fn property_descriptor(&self, name: &str) -> Result<&PropertyDescriptor, NativeError> {
        self.class
            .find_property(name)
            .ok_or_else(|| NativeError::PropertyNotFound {
                class: self.class.name().to_owned(),
                name: name.to_owned(),
            })
    }

    /// Write a property value by name.
    pub fn set_property(&self, name: &str, value: NativeValue) -> Result<(), NativeError> {
        let descriptor = self.property_descriptor(name)?;
        if !value.matches_kind(&descriptor.kind) {
            return Err(NativeError::TypeMismatch {
                expected: descriptor.kind.name(),
                actual: value.type_name(),
            });
        }
        self.write_properties(|buffer| buffer.set(descriptor.index, value));
        Ok(())
    }

    /// Fire a delegate property with `params`.
    ///
    /// Handlers run without the property lock held, so they may read or
    /// rebind this object's properties.
    pub fn fire_event(
        &self,
        name: &str,
        params: &mut PropertyBuffer,
    ) -> Result<BroadcastResult, NativeError> {
        let descriptor = self.property_descriptor(name)?;
        let snapshot = self.read_properties(|buffer| buffer.get(descriptor.index).cloned());
        match snapshot {
            Some(NativeValue::MulticastDelegate(delegate)) => Ok(delegate.broadcast(params)),
            Some(NativeValue::Delegate(delegate)) => {
                let mut result = BroadcastResult::default();
                if delegate.is_bound() {
                    if delegate.execute_if_bound(params) {
                        result.delivered = 1;
                    } else {
                        result.failed = 1;
                    }
                }
                Ok(result)
            }
            Some(NativeValue::Zeroed) => Ok(BroadcastResult::default()),
            Some(other) => Err(NativeError::TypeMismatch {
                expected: "delegate",
                actual: other.type_name(),
            }),
            None => Err(NativeError::PropertyNotFound {
                class: self.class.name().to_owned(),
                name: name.to_owned(),
            }),
        }
    }
}

impl fmt::Debug for NativeObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeObject")
            .field("handle", &self.handle)
            .field("name", &self.name)
            .field("class", &self.class.name())
            .finish()
    }
}

struct HeapSlot {
    generation: u32,
    object: Option<Arc<NativeObject>>,
    root_count: u32,
}

#[derive(Default)]
struct HeapSlots {
    slots: Vec<HeapSlot>,
    free_list: Vec<u32>,
    class_objects: FxHashMap<TypeHash, ObjectHandle>,
}

impl HeapSlots {
    fn live(&self, handle: ObjectHandle) -> Option<&HeapSlot> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation && slot.object.is_some())
    }

    fn live_mut(&mut self, handle: ObjectHandle) -> Option<&mut HeapSlot> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation && slot.object.is_some())
    }

    fn allocate(
        &mut self,
        build: impl FnOnce(ObjectHandle) -> NativeObject,
        root_count: u32,
    ) -> ObjectHandle {
        let handle = match self.free_list.pop() {
            Some(index) => ObjectHandle::new(index, self.slots[index as usize].generation),
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(HeapSlot {
                    generation: 0,
                    object: None,
                    root_count: 0,
                });
                ObjectHandle::new(index, 0)
            }
        };
        let slot = &mut self.slots[handle.index as usize];
        slot.object = Some(Arc::new(build(handle)));
        slot.root_count = root_count;
        handle
    }

    /// Vacate a slot, returning the object it held.
    fn free(&mut self, handle: ObjectHandle) -> Option<Arc<NativeObject>> {
        let slot = self.live_mut(handle)?;
        let object = slot.object.take();
        slot.generation = slot.generation.wrapping_add(1);
        slot.root_count = 0;
        self.free_list.push(handle.index);
        if let Some(object) = &object
            && let Some(class) = object.represented_class()
        {
            self.class_objects.remove(&class.hash());
        }
        object
    }
}

/// Heap of native objects.
#[derive(Default)]
pub struct ObjectHeap {
    inner: RwLock<HeapSlots>,
    listeners: RwLock<Vec<Weak<dyn ObjectListener>>>,
}

impl ObjectHeap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a rooted object of `class`.
    pub fn spawn(&self, class: &Arc<NativeClass>, name: impl Into<String>) -> ObjectHandle {
        self.spawn_object(class, name.into(), None, None, 1)
    }

    /// Create an object that the next garbage collection destroys unless rooted.
    pub fn spawn_unrooted(
        &self,
        class: &Arc<NativeClass>,
        name: impl Into<String>,
    ) -> ObjectHandle {
        self.spawn_object(class, name.into(), None, None, 0)
    }

    /// Create a rooted sub-object owned by `outer`.
    pub fn spawn_subobject(
        &self,
        class: &Arc<NativeClass>,
        name: impl Into<String>,
        outer: ObjectHandle,
    ) -> ObjectHandle {
        self.spawn_object(class, name.into(), Some(outer), None, 1)
    }

    /// The object representing `class`, created on first request.
    pub fn class_object(&self, class: &Arc<NativeClass>) -> ObjectHandle {
        if let Some(handle) = self.inner.read().class_objects.get(&class.hash()) {
            return *handle;
        }
        let mut inner = self.inner.write();
        if let Some(handle) = inner.class_objects.get(&class.hash()) {
            return *handle;
        }
        let metaclass = Arc::clone(NativeClass::metaclass());
        let represented = Arc::clone(class);
        let name = class.name().to_owned();
        let handle = inner.allocate(
            |handle| NativeObject {
                handle,
                name,
                properties: RwLock::new(PropertyBuffer::for_layout(metaclass.properties())),
                class: metaclass,
                outer: None,
                represented_class: Some(represented),
            },
            1,
        );
        inner.class_objects.insert(class.hash(), handle);
        handle
    }

    fn spawn_object(
        &self,
        class: &Arc<NativeClass>,
        name: String,
        outer: Option<ObjectHandle>,
        represented_class: Option<Arc<NativeClass>>,
        root_count: u32,
    ) -> ObjectHandle {
        let class = Arc::clone(class);
        let properties = PropertyBuffer::for_layout(class.properties());
        let handle = self.inner.write().allocate(
            |handle| NativeObject {
                handle,
                name,
                class,
                outer,
                represented_class,
                properties: RwLock::new(properties),
            },
            root_count,
        );
        debug!(target: "scriptbridge", %handle, "spawned native object");
        handle
    }

    /// Resolve a handle. Stale handles resolve to `None`.
    pub fn get(&self, handle: ObjectHandle) -> Option<Arc<NativeObject>> {
        self.inner.read().live(handle).and_then(|slot| slot.object.clone())
    }

    pub fn is_alive(&self, handle: ObjectHandle) -> bool {
        self.inner.read().live(handle).is_some()
    }

    /// Find a live sub-object of `outer` by name.
    pub fn find_subobject(&self, outer: ObjectHandle, name: &str) -> Option<ObjectHandle> {
        self.inner
            .read()
            .slots
            .iter()
            .filter_map(|slot| slot.object.as_ref())
            .find(|object| object.outer == Some(outer) && object.name == name)
            .map(|object| object.handle)
    }

    /// Dotted path of names from the outermost object down to `handle`.
    pub fn path_name(&self, handle: ObjectHandle) -> Option<String> {
        let inner = self.inner.read();
        let mut names = Vec::new();
        let mut current = Some(handle);
        while let Some(handle) = current {
            let object = inner.live(handle)?.object.as_ref()?;
            names.push(object.name.clone());
            current = object.outer;
        }
        names.reverse();
        Some(names.join("."))
    }

    /// Increment the root count. Returns false for stale handles.
    pub fn add_root(&self, handle: ObjectHandle) -> bool {
        match self.inner.write().live_mut(handle) {
            Some(slot) => {
                slot.root_count = slot.root_count.saturating_add(1);
                true
            }
            None => false,
        }
    }

    /// Decrement the root count. Returns false for stale handles.
    pub fn remove_root(&self, handle: ObjectHandle) -> bool {
        match self.inner.write().live_mut(handle) {
            Some(slot) => {
                slot.root_count = slot.root_count.saturating_sub(1);
                true
            }
            None => false,
        }
    }

    pub fn root_count(&self, handle: ObjectHandle) -> Option<u32> {
        self.inner.read().live(handle).map(|slot| slot.root_count)
    }

    /// Destroy an object. Returns false if it was already gone.
    pub fn destroy(&self, handle: ObjectHandle) -> bool {
        let object = self.inner.write().free(handle);
        match object {
            Some(object) => {
                debug!(
                    target: "scriptbridge",
                    %handle,
                    name = object.name(),
                    "destroyed native object"
                );
                self.notify_destroyed(&[handle]);
                true
            }
            None => false,
        }
    }

    /// Destroy every object whose root count is zero. Returns how many were destroyed.
    pub fn collect_garbage(&self) -> usize {
        let destroyed: Vec<ObjectHandle> = {
            let mut inner = self.inner.write();
            let unrooted: Vec<ObjectHandle> = inner
                .slots
                .iter()
                .filter(|slot| slot.root_count == 0)
                .filter_map(|slot| slot.object.as_ref().map(|object| object.handle))
                .collect();
            unrooted
                .into_iter()
                .filter(|handle| inner.free(*handle).is_some())
                .collect()
        };
        self.notify_destroyed(&destroyed);
        destroyed.len()
    }

    pub fn live_count(&self) -> usize {
        self.inner
            .read()
            .slots
            .iter()
            .filter(|slot| slot.object.is_some())
            .count()
    }

    pub fn add_listener(&self, listener: Weak<dyn ObjectListener>) {
        self.listeners.write().push(listener);
    }

    fn notify_destroyed(&self, handles: &[ObjectHandle]) {
        if handles.is_empty() {
            return;
        }
        let listeners: Vec<Arc<dyn ObjectListener>> = {
            let mut listeners = self.listeners.write();
            listeners.retain(|listener| listener.strong_count() > 0);
            listeners.iter().filter_map(Weak::upgrade).collect()
        };
        for listener in &listeners {
            for handle in handles {
                listener.on_object_destroyed(*handle);
            }
        }
    }
}

impl fmt::Debug for ObjectHeap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("ObjectHeap")
            .field("slot_count", &inner.slots.len())
            .field("free_count", &inner.free_list.len())
            .finish()
    }
}
