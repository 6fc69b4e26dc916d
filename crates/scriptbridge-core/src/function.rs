//! Native functions and the context their bodies run in.

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::{
    FromNative, FunctionSignature, IntoNative, NativeError, NativeObject, NativeValue, ObjectHeap,
    PropertyBuffer, PropertyDescriptor, TypeHash,
};

/// Trait for callable native function bodies.
pub trait NativeCallable {
    fn call(&self, ctx: &mut CallContext<'_>) -> Result<(), NativeError>;
}

impl<F> NativeCallable for F
where
    F: Fn(&mut CallContext<'_>) -> Result<(), NativeError>,
{
    fn call(&self, ctx: &mut CallContext<'_>) -> Result<(), NativeError> {
        (self)(ctx)
    }
}

/// Type-erased native function body.
#[derive(Clone)]
pub struct NativeFn {
    inner: Arc<dyn NativeCallable + Send + Sync>,
}

impl NativeFn {
    pub fn new<F>(f: F) -> Self
    where
        F: NativeCallable + Send + Sync + 'static,
    {
        Self { inner: Arc::new(f) }
    }

    pub fn call(&self, ctx: &mut CallContext<'_>) -> Result<(), NativeError> {
        self.inner.call(ctx)
    }
}

impl fmt::Debug for NativeFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFn").finish_non_exhaustive()
    }
}

/// A reflected native function.
///
/// Defaults are textual, keyed by parameter name, and parsed into the call
/// frame only when the caller supplies no argument for that parameter.
#[derive(Debug)]
pub struct NativeFunction {
    name: String,
    hash: TypeHash,
    owner: TypeHash,
    signature: Arc<FunctionSignature>,
    defaults: FxHashMap<String, String>,
    super_function: Option<Arc<NativeFunction>>,
    body: NativeFn,
}

impl NativeFunction {
    pub fn new<F>(name: impl Into<String>, signature: FunctionSignature, body: F) -> Self
    where
        F: Fn(&mut CallContext<'_>) -> Result<(), NativeError> + Send + Sync + 'static,
    {
        Self::from_callable(name, signature, NativeFn::new(body))
    }

    pub fn from_callable(
        name: impl Into<String>,
        signature: FunctionSignature,
        body: NativeFn,
    ) -> Self {
        let name = name.into();
        Self {
            hash: TypeHash::from_function(TypeHash::EMPTY, &name),
            name,
            owner: TypeHash::EMPTY,
            signature: Arc::new(signature),
            defaults: FxHashMap::default(),
            super_function: None,
            body,
        }
    }

    /// Declare the textual default of a parameter.
    pub fn with_default(mut self, param: impl Into<String>, text: impl Into<String>) -> Self {
        self.defaults.insert(param.into(), text.into());
        self
    }

    /// Set the implementation this function overrides.
    pub fn with_super(mut self, super_function: Arc<NativeFunction>) -> Self {
        self.super_function = Some(super_function);
        self
    }

    /// Bind to an owning class; an explicit super function wins over `overridden`.
    pub(crate) fn attach(
        mut self,
        owner: TypeHash,
        overridden: Option<Arc<NativeFunction>>,
    ) -> Self {
        self.owner = owner;
        self.hash = TypeHash::from_function(owner, &self.name);
        if self.super_function.is_none() {
            self.super_function = overridden;
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn hash(&self) -> TypeHash {
        self.hash
    }

    pub fn owner(&self) -> TypeHash {
        self.owner
    }

    pub fn signature(&self) -> &Arc<FunctionSignature> {
        &self.signature
    }

    pub fn params(&self) -> &[PropertyDescriptor] {
        self.signature.params()
    }

    pub fn parms_size(&self) -> usize {
        self.signature.parms_size()
    }

    pub fn default_text(&self, param: &str) -> Option<&str> {
        self.defaults.get(param).map(String::as_str)
    }

    pub fn super_function(&self) -> Option<&Arc<NativeFunction>> {
        self.super_function.as_ref()
    }

    /// Run the body against `this` with an already marshaled frame.
    pub fn invoke(
        &self,
        this: &Arc<NativeObject>,
        frame: &mut PropertyBuffer,
        heap: &ObjectHeap,
    ) -> Result<(), NativeError> {
        let mut ctx = CallContext::new(this, self, frame, heap);
        self.body.call(&mut ctx)
    }
}

/// Context for native function bodies.
///
/// Parameters are addressed by name through the function's signature.
///
/// ```ignore
/// let amount: f32 = ctx.param("Amount")?;
/// ctx.set_param("Remaining", 10i32)?;
/// ctx.set_return(true)?;
/// ```
pub struct CallContext<'a> {
    this: &'a Arc<NativeObject>,
    function: &'a NativeFunction,
    frame: &'a mut PropertyBuffer,
    heap: &'a ObjectHeap,
}

impl<'a> CallContext<'a> {
    pub fn new(
        this: &'a Arc<NativeObject>,
        function: &'a NativeFunction,
        frame: &'a mut PropertyBuffer,
        heap: &'a ObjectHeap,
    ) -> Self {
        Self {
            this,
            function,
            frame,
            heap,
        }
    }

    pub fn this(&self) -> &Arc<NativeObject> {
        self.this
    }

    pub fn function(&self) -> &NativeFunction {
        self.function
    }

    pub fn heap(&self) -> &ObjectHeap {
        self.heap
    }

    pub fn frame(&self) -> &PropertyBuffer {
        &*self.frame
    }

    fn descriptor(&self, name: &str) -> Result<&'a PropertyDescriptor, NativeError> {
        let function: &'a NativeFunction = self.function;
        function
            .signature
            .find(name)
            .ok_or_else(|| NativeError::ParameterNotFound {
                function: function.name.clone(),
                name: name.to_owned(),
            })
    }

    /// Raw access to a parameter slot.
    pub fn param_value(&self, name: &str) -> Result<&NativeValue, NativeError> {
        let descriptor = self.descriptor(name)?;
        self.frame
            .get(descriptor.index)
            .ok_or_else(|| NativeError::ParameterNotFound {
                function: self.function.name.clone(),
                name: name.to_owned(),
            })
    }

    /// Mutable access to a parameter slot, materialized as the parameter's kind.
    pub fn param_value_mut(&mut self, name: &str) -> Result<&mut NativeValue, NativeError> {
        let descriptor = self.descriptor(name)?;
        let function = self.function;
        self.frame
            .value_mut(descriptor.index, &descriptor.kind)
            .ok_or_else(|| NativeError::ParameterNotFound {
                function: function.name.clone(),
                name: name.to_owned(),
            })
    }

    /// Get a typed parameter value.
    pub fn param<T: FromNative>(&self, name: &str) -> Result<T, NativeError> {
        T::from_native(self.param_value(name)?)
    }

    /// Write a typed value into a parameter slot (for out-parameters).
    pub fn set_param<T: IntoNative>(&mut self, name: &str, value: T) -> Result<(), NativeError> {
        *self.param_value_mut(name)? = value.into_native();
        Ok(())
    }

    /// Set a typed return value.
    pub fn set_return<T: IntoNative>(&mut self, value: T) -> Result<(), NativeError> {
        self.set_return_value(value.into_native())
    }

    /// Set the return slot from a raw value.
    pub fn set_return_value(&mut self, value: NativeValue) -> Result<(), NativeError> {
        let function: &'a NativeFunction = self.function;
        let index = function
            .signature
            .return_param()
            .map(|p| p.index)
            .ok_or_else(|| NativeError::NoReturnValue {
                function: function.name.clone(),
            })?;
        if self.frame.set(index, value) {
            Ok(())
        } else {
            Err(NativeError::NoReturnValue {
                function: function.name.clone(),
            })
        }
    }
}
