//! Native event dispatch.
//!
//! Delegate properties hold [`NativeEventTarget`]s. A single-cast
//! [`ScriptDelegate`] has at most one target; a [`MulticastScriptDelegate`]
//! broadcasts to every target in registration order. Targets receive the
//! event's parameter block and report failure with a bare [`EventError`];
//! whatever went wrong inside a target stays inside it.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::PropertyBuffer;

/// Generic failure reported by an event target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("event handler failed")]
pub struct EventError;

/// Something native code can deliver events to.
pub trait NativeEventTarget: Send + Sync {
    /// Handle one event. `params` is laid out by the delegate's signature.
    fn receive(&self, params: &mut PropertyBuffer) -> Result<(), EventError>;
}

/// Identity of a target, used to keep multicast lists free of duplicates.
fn target_id(target: &Arc<dyn NativeEventTarget>) -> *const () {
    Arc::as_ptr(target) as *const ()
}

/// Native closure target.
pub struct FnEventTarget<F>(F);

impl<F> FnEventTarget<F>
where
    F: Fn(&mut PropertyBuffer) -> Result<(), EventError> + Send + Sync + 'static,
{
    pub fn new(f: F) -> Arc<dyn NativeEventTarget> {
        Arc::new(Self(f))
    }
}

impl<F> NativeEventTarget for FnEventTarget<F>
where
    F: Fn(&mut PropertyBuffer) -> Result<(), EventError> + Send + Sync,
{
    fn receive(&self, params: &mut PropertyBuffer) -> Result<(), EventError> {
        (self.0)(params)
    }
}

/// Outcome of a broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BroadcastResult {
    pub delivered: usize,
    pub failed: usize,
}

impl BroadcastResult {
    pub fn is_ok(&self) -> bool {
        self.failed == 0
    }
}

/// Single-cast delegate.
#[derive(Clone, Default)]
pub struct ScriptDelegate {
    target: Option<Arc<dyn NativeEventTarget>>,
}

impl ScriptDelegate {
    /// Bind `target`, replacing any previous binding.
    pub fn bind(&mut self, target: Arc<dyn NativeEventTarget>) {
        self.target = Some(target);
    }

    pub fn unbind(&mut self) {
        self.target = None;
    }

    pub fn is_bound(&self) -> bool {
        self.target.is_some()
    }

    pub fn is_bound_to(&self, target: &Arc<dyn NativeEventTarget>) -> bool {
        self.target
            .as_ref()
            .is_some_and(|bound| target_id(bound) == target_id(target))
    }

    /// Deliver to the bound target. Returns false when unbound or when the target failed.
    pub fn execute_if_bound(&self, params: &mut PropertyBuffer) -> bool {
        match &self.target {
            Some(target) => target.receive(params).is_ok(),
            None => false,
        }
    }
}

impl fmt::Debug for ScriptDelegate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptDelegate")
            .field("bound", &self.is_bound())
            .finish()
    }
}

/// Multicast delegate.
#[derive(Clone, Default)]
pub struct MulticastScriptDelegate {
    targets: Vec<Arc<dyn NativeEventTarget>>,
}

impl MulticastScriptDelegate {
    /// Add `target` unless it is already registered. Returns whether it was added.
    pub fn add(&mut self, target: Arc<dyn NativeEventTarget>) -> bool {
        if self.contains(&target) {
            return false;
        }
        self.targets.push(target);
        true
    }

    pub fn remove(&mut self, target: &Arc<dyn NativeEventTarget>) -> bool {
        let before = self.targets.len();
        let id = target_id(target);
        self.targets.retain(|t| target_id(t) != id);
        self.targets.len() != before
    }

    pub fn contains(&self, target: &Arc<dyn NativeEventTarget>) -> bool {
        let id = target_id(target);
        self.targets.iter().any(|t| target_id(t) == id)
    }

    pub fn clear(&mut self) {
        self.targets.clear();
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Deliver to every target in registration order.
    ///
    /// Iterates a snapshot, so targets may rebind the delegate while it fires.
    pub fn broadcast(&self, params: &mut PropertyBuffer) -> BroadcastResult {
        let targets = self.targets.clone();
        let mut result = BroadcastResult::default();
        for target in targets {
            match target.receive(params) {
                Ok(()) => result.delivered += 1,
                Err(EventError) => result.failed += 1,
            }
        }
        result
    }
}

impl fmt::Debug for MulticastScriptDelegate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MulticastScriptDelegate")
            .field("targets", &self.targets.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_target(counter: Arc<AtomicUsize>) -> Arc<dyn NativeEventTarget> {
        FnEventTarget::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    #[test]
    fn single_cast_replaces() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let mut delegate = ScriptDelegate::default();
        let mut params = PropertyBuffer::zeroed(0);

        assert!(!delegate.execute_if_bound(&mut params));
        delegate.bind(counting_target(first.clone()));
        let replacement = counting_target(second.clone());
        delegate.bind(replacement.clone());
        assert!(delegate.is_bound_to(&replacement));
        assert!(delegate.execute_if_bound(&mut params));

        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn multicast_adds_once_per_target() {
        let counter = Arc::new(AtomicUsize::new(0));
        let target = counting_target(counter.clone());
        let mut delegate = MulticastScriptDelegate::default();

        assert!(delegate.add(target.clone()));
        assert!(!delegate.add(target.clone()));
        assert!(delegate.add(counting_target(counter.clone())));

        let result = delegate.broadcast(&mut PropertyBuffer::zeroed(0));
        assert_eq!(result.delivered, 2);
        assert_eq!(counter.load(Ordering::SeqCst), 2);

        assert!(delegate.remove(&target));
        assert_eq!(delegate.len(), 1);
    }

    #[test]
    fn broadcast_counts_failures() {
        let mut delegate = MulticastScriptDelegate::default();
        delegate.add(FnEventTarget::new(|_| Err(EventError)));
        delegate.add(FnEventTarget::new(|_| Ok(())));

        let result = delegate.broadcast(&mut PropertyBuffer::zeroed(0));
        assert_eq!(result, BroadcastResult { delivered: 1, failed: 1 });
        assert!(!result.is_ok());
    }
}
