use std::sync::Arc;

use scriptbridge_core::{NativeEventTarget, NativeObject, NativeValue, PropertyKind};
use tracing::error;

use crate::logging::TARGET;
use crate::runtime::RuntimeInner;
use crate::{BindingError, DelegateProperty, ObjectProxy, ScriptCallable, ScriptClass, ScriptValue};

/// Binds scripted callables to native event properties.
#[derive(Clone, Copy)]
pub struct EventBinder<'rt> {
    runtime: &'rt RuntimeInner,
}

impl<'rt> EventBinder<'rt> {
    pub(crate) fn new(runtime: &'rt RuntimeInner) -> Self {
        Self { runtime }
    }

    /// Bind `callable` to the event property `event` of `target`.
    ///
    /// A missing event, or a property that is not an event, is an error when
    /// `fail_on_missing` is set and a no-op (`Ok(false)`) otherwise.
    /// Multicast events gain the handler once; single-cast events are rebound.
    pub fn bind(
        &self,
        target: &ObjectProxy,
        event: &str,
        callable: &Arc<dyn ScriptCallable>,
        fail_on_missing: bool,
    ) -> Result<bool, BindingError> {
        let _guard = self.runtime.lock.acquire();
        let object = target.native().ok_or(BindingError::InvalidTarget)?;
        self.bind_native(&object, event, callable, fail_on_missing)
    }

    /// Bind through a delegate-property handle read off an object.
    pub fn bind_property(
        &self,
        property: &DelegateProperty,
        callable: &Arc<dyn ScriptCallable>,
    ) -> Result<bool, BindingError> {
        let owner = property.owner().ok_or(BindingError::InvalidTarget)?;
        self.bind(owner, property.property(), callable, true)
    }

    /// Bind every callable of `class` that carries an event annotation.
    ///
    /// The annotation is `"Event"` or `"Component.Event"`. Every annotated
    /// callable is attempted; failures are logged and returned together.
    pub fn bind_by_annotation(
        &self,
        target: &ObjectProxy,
        class: &ScriptClass,
    ) -> Result<usize, BindingError> {
        let _guard = self.runtime.lock.acquire();
        let object = target.native().ok_or(BindingError::InvalidTarget)?;
        let attribute = &self.runtime.config.event_attribute;

        let mut bound = 0;
        let mut errors = Vec::new();
        for (name, callable) in class.callables() {
            let Some(annotation) = callable.attribute(attribute) else {
                continue;
            };
            match self.bind_annotated(&object, name, callable, &annotation) {
                Ok(true) => bound += 1,
                Ok(false) => {}
                Err(err) => {
                    error!(target: TARGET, class = class.name(), callable = name, "{err}");
                    errors.push(err);
                }
            }
        }

        match errors.len() {
            0 => Ok(bound),
            1 => Err(errors.remove(0)),
            _ => Err(BindingError::Multiple(errors)),
        }
    }

    /// Bind every callable named `<prefix>snake_case` to the matching
    /// `PascalCase` event, skipping events that do not exist.
    pub fn autobind(
        &self,
        target: &ObjectProxy,
        class: &ScriptClass,
    ) -> Result<usize, BindingError> {
        let _guard = self.runtime.lock.acquire();
        let object = target.native().ok_or(BindingError::InvalidTarget)?;
        let prefix = &self.runtime.config.autobind_prefix;

        let mut bound = 0;
        for (name, callable) in class.callables() {
            let Some(event) = autobind_event_name(name, prefix) else {
                continue;
            };
            if self.bind_native(&object, &event, callable, false)? {
                bound += 1;
            }
        }
        Ok(bound)
    }

    fn bind_annotated(
        &self,
        object: &NativeObject,
        name: &str,
        callable: &Arc<dyn ScriptCallable>,
        annotation: &ScriptValue,
    ) -> Result<bool, BindingError> {
        let text = annotation.as_str().ok_or_else(|| BindingError::AnnotationNotString {
            callable: name.to_owned(),
        })?;
        let malformed = || BindingError::InvalidAnnotation {
            callable: name.to_owned(),
            annotation: text.to_owned(),
        };

        let parts: Vec<&str> = text.split('.').collect();
        if parts.iter().any(|part| part.is_empty()) {
            return Err(malformed());
        }
        match parts.as_slice() {
            [event] => self.bind_native(object, event, callable, true),
            [component, event] => {
                let heap = self.runtime.proxies.heap();
                let sub_object = heap
                    .find_subobject(object.handle(), component)
                    .and_then(|handle| heap.get(handle))
                    .ok_or_else(|| BindingError::ComponentNotFound {
                        owner: object.name().to_owned(),
                        component: (*component).to_owned(),
                    })?;
                self.bind_native(&sub_object, event, callable, true)
            }
            _ => Err(malformed()),
        }
    }

    fn bind_native(
        &self,
        object: &NativeObject,
        event: &str,
        callable: &Arc<dyn ScriptCallable>,
        fail_on_missing: bool,
    ) -> Result<bool, BindingError> {
        let class = object.class();
        let Some(descriptor) = class.find_property(event) else {
            return if fail_on_missing {
                Err(BindingError::EventNotFound {
                    class: class.name().to_owned(),
                    event: event.to_owned(),
                })
            } else {
                Ok(false)
            };
        };
        let signature = match &descriptor.kind {
            PropertyKind::Delegate(signature) | PropertyKind::MulticastDelegate(signature) => {
                signature
            }
            _ if fail_on_missing => {
                return Err(BindingError::NotAnEvent {
                    class: class.name().to_owned(),
                    property: event.to_owned(),
                });
            }
            _ => return Ok(false),
        };

        let handle: Arc<dyn NativeEventTarget> =
            self.runtime
                .delegates
                .find_or_add(object.handle(), callable, signature);
        object.write_properties(|buffer| {
            match buffer.value_mut(descriptor.index, &descriptor.kind) {
                Some(NativeValue::MulticastDelegate(delegate)) => {
                    delegate.add(handle);
                }
                Some(NativeValue::Delegate(delegate)) => delegate.bind(handle),
                _ => {}
            }
        });
        Ok(true)
    }
}

/// `on_begin_play` → `BeginPlay`. Segments must match `[a-z0-9]+`.
pub(crate) fn autobind_event_name(name: &str, prefix: &str) -> Option<String> {
    let rest = name.strip_prefix(prefix)?;
    let mut event = String::with_capacity(rest.len());
    for segment in rest.split('_') {
        if segment.is_empty()
            || !segment
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
        {
            return None;
        }
        let (first, tail) = segment.split_at(1);
        event.push_str(&first.to_ascii_uppercase());
        event.push_str(tail);
    }
    Some(event)
}
