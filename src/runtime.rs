//! The scripting-facing runtime.
//!
//! [`ScriptRuntime`] owns everything the bridge shares: configuration, the
//! exclusivity lock, the proxy cache, struct converters and delegate
//! handles. It registers itself with the native heap so that destroying a
//! native object evicts its proxy and drops its delegate handles.

use std::fmt;
use std::sync::{Arc, Weak};

use scriptbridge_core::{
    NativeClass, NativeFunction, ObjectHandle, ObjectHeap, ObjectListener, PropertyKind,
};
use scriptbridge_registry::NativeRegistry;

use crate::{
    BridgeConfig, BridgeError, CallArgs, DelegateProperty, DelegateRegistry, EventBinder,
    ExclusiveGuard, ExclusivityLock, InvocationError, InvocationGateway, ObjectProxy,
    ObjectProxyCache, PropertyConverter, Result, ScriptCallable, ScriptError, ScriptValue,
    StructConverters,
};

pub(crate) struct RuntimeInner {
    pub(crate) config: BridgeConfig,
    pub(crate) lock: ExclusivityLock,
    pub(crate) registry: NativeRegistry,
    pub(crate) proxies: ObjectProxyCache,
    pub(crate) structs: StructConverters,
    pub(crate) delegates: DelegateRegistry,
}

impl RuntimeInner {
    pub(crate) fn converter(&self) -> PropertyConverter<'_> {
        PropertyConverter::new(&self.proxies, &self.structs)
    }

    pub(crate) fn gateway(&self) -> InvocationGateway<'_> {
        InvocationGateway::new(&self.config, self.converter(), &self.registry)
    }
}

impl ObjectListener for RuntimeInner {
    fn on_object_destroyed(&self, handle: ObjectHandle) {
        self.proxies.evict(handle);
        self.proxies.purge();
        self.delegates.release_target(handle);
    }
}

/// Shared handle to the bridge state. Cloning is cheap.
#[derive(Clone)]
pub struct ScriptRuntime {
    inner: Arc<RuntimeInner>,
}

impl ScriptRuntime {
    pub fn new(heap: Arc<ObjectHeap>, registry: NativeRegistry) -> Self {
        Self::with_config(heap, registry, BridgeConfig::default())
    }

    pub fn with_config(
        heap: Arc<ObjectHeap>,
        registry: NativeRegistry,
        config: BridgeConfig,
    ) -> Self {
        let proxies = ObjectProxyCache::new(Arc::clone(&heap));
        let inner = Arc::new_cyclic(|runtime| RuntimeInner {
            config,
            lock: ExclusivityLock::new(),
            registry,
            proxies,
            structs: StructConverters::new(),
            delegates: DelegateRegistry::new(runtime.clone()),
        });
        let listener: Weak<dyn ObjectListener> = Arc::downgrade(&inner) as Weak<RuntimeInner>;
        heap.add_listener(listener);
        Self { inner }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.inner.config
    }

    pub fn heap(&self) -> &Arc<ObjectHeap> {
        self.inner.proxies.heap()
    }

    pub fn registry(&self) -> &NativeRegistry {
        &self.inner.registry
    }

    pub fn proxies(&self) -> &ObjectProxyCache {
        &self.inner.proxies
    }

    pub fn structs(&self) -> &StructConverters {
        &self.inner.structs
    }

    pub fn delegates(&self) -> &DelegateRegistry {
        &self.inner.delegates
    }

    pub fn lock(&self) -> &ExclusivityLock {
        &self.inner.lock
    }

    /// Take the exclusivity lock. Re-entrant on the same thread.
    pub fn acquire(&self) -> ExclusiveGuard<'_> {
        self.inner.lock.acquire()
    }

    pub fn converter(&self) -> PropertyConverter<'_> {
        self.inner.converter()
    }

    pub fn gateway(&self) -> InvocationGateway<'_> {
        self.inner.gateway()
    }

    pub fn binder(&self) -> EventBinder<'_> {
        EventBinder::new(&self.inner)
    }

    /// The proxy of a live native object.
    pub fn wrap(&self, handle: ObjectHandle) -> Option<Arc<ObjectProxy>> {
        let _guard = self.acquire();
        self.inner.proxies.get_or_create(handle)
    }

    /// The proxy of the class object representing `class`.
    pub fn class_proxy(&self, class: &Arc<NativeClass>) -> Option<Arc<ObjectProxy>> {
        let handle = self.heap().class_object(class);
        self.wrap(handle)
    }

    // ==========================================================================
    // Attribute protocol
    // ==========================================================================

    /// Read `name` off `proxy`: a native property, then a native function as a
    /// bound method, then the proxy's own attributes.
    pub fn get_attribute(&self, proxy: &Arc<ObjectProxy>, name: &str) -> Result<ScriptValue> {
        let _guard = self.acquire();
        let object = proxy.native().ok_or(BridgeError::InvalidProxy)?;
        let class = object.class();

        if let Some(descriptor) = class.find_property(name) {
            if let PropertyKind::Delegate(signature) | PropertyKind::MulticastDelegate(signature) =
                &descriptor.kind
            {
                return Ok(ScriptValue::Property(DelegateProperty::new(
                    Some(Arc::clone(proxy)),
                    name,
                    Arc::clone(signature),
                    matches!(descriptor.kind, PropertyKind::MulticastDelegate(_)),
                )));
            }
            let converter = self.converter();
            let value = object.read_properties(|buffer| converter.to_dynamic(descriptor, buffer))?;
            return Ok(value);
        }

        if let Some(function) = class.find_function(name) {
            return Ok(ScriptValue::Callable(Arc::new(BoundNativeMethod {
                runtime: Arc::downgrade(&self.inner),
                target: Arc::clone(proxy),
                function,
            })));
        }

        proxy.aux_attribute(name).ok_or_else(|| BridgeError::AttributeNotFound {
            class: class.name().to_owned(),
            name: name.to_owned(),
        })
    }

    /// Write `name` on `proxy`: a native property if one exists, otherwise
    /// the proxy's own attributes.
    pub fn set_attribute(
        &self,
        proxy: &Arc<ObjectProxy>,
        name: &str,
        value: ScriptValue,
    ) -> Result<()> {
        let _guard = self.acquire();
        let object = proxy.native().ok_or(BridgeError::InvalidProxy)?;

        if let Some(descriptor) = object.class().find_property(name) {
            let converter = self.converter();
            object.write_properties(|buffer| converter.from_dynamic(&value, descriptor, buffer))?;
            return Ok(());
        }

        proxy.set_aux_attribute(name, value);
        Ok(())
    }

    /// Call the native function `name` on `proxy`.
    pub fn call_method(
        &self,
        proxy: &Arc<ObjectProxy>,
        name: &str,
        args: &CallArgs,
    ) -> Result<ScriptValue> {
        let guard = self.acquire();
        let function = proxy
            .class()
            .find_function(name)
            .ok_or_else(|| InvocationError::FunctionNotFound {
                class: proxy.class().name().to_owned(),
                name: name.to_owned(),
            })?;
        Ok(self.gateway().call(&guard, proxy, &function, args)?)
    }
}

impl fmt::Debug for ScriptRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptRuntime")
            .field("config", &self.inner.config)
            .field("proxies", &self.inner.proxies.len())
            .field("delegate_handles", &self.inner.delegates.len())
            .finish_non_exhaustive()
    }
}

/// A native function bound to the object it was read from.
pub struct BoundNativeMethod {
    runtime: Weak<RuntimeInner>,
    target: Arc<ObjectProxy>,
    function: Arc<NativeFunction>,
}

impl BoundNativeMethod {
    pub fn target(&self) -> &Arc<ObjectProxy> {
        &self.target
    }

    pub fn function(&self) -> &Arc<NativeFunction> {
        &self.function
    }

    /// Call with positional and named arguments.
    pub fn call_with(&self, args: &CallArgs) -> Result<ScriptValue> {
        let runtime = self
            .runtime
            .upgrade()
            .ok_or_else(|| ScriptError::runtime_error("scripting runtime has shut down"))?;
        let guard = runtime.lock.acquire();
        Ok(runtime.gateway().call(&guard, &self.target, &self.function, args)?)
    }
}

impl ScriptCallable for BoundNativeMethod {
    fn name(&self) -> &str {
        self.function.name()
    }

    fn call(&self, args: &[ScriptValue]) -> std::result::Result<ScriptValue, ScriptError> {
        self.call_with(&CallArgs::positional(args.iter().cloned()))
            .map_err(ScriptError::from)
    }
}

impl fmt::Debug for BoundNativeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundNativeMethod")
            .field("target", &self.target.name())
            .field("function", &self.function.name())
            .finish()
    }
}
