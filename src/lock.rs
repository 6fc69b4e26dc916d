//! The exclusivity lock serializing access to scripting state.
//!
//! The lock is re-entrant per thread: a thread already holding it may
//! acquire it again, and it is released when the outermost guard drops.
//! Long-running native calls go through [`ExclusiveGuard::unlocked`], which
//! releases every level the thread holds for the duration of the call.
//!
//! ```
//! use scriptbridge::ExclusivityLock;
//!
//! let lock = ExclusivityLock::new();
//! let guard = lock.acquire();
//! let nested = lock.acquire();
//! assert_eq!(lock.depth(), 2);
//! drop(nested);
//!
//! guard.unlocked(|| assert!(!lock.is_locked()));
//! assert_eq!(lock.depth(), 1);
//! ```

use std::marker::PhantomData;
use std::thread::{self, ThreadId};

use parking_lot::{Condvar, Mutex};

#[derive(Debug, Default)]
struct LockState {
    owner: Option<ThreadId>,
    depth: usize,
}

/// Re-entrant exclusive lock.
#[derive(Debug, Default)]
pub struct ExclusivityLock {
    state: Mutex<LockState>,
    released: Condvar,
}

impl ExclusivityLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until the calling thread holds the lock.
    pub fn acquire(&self) -> ExclusiveGuard<'_> {
        self.lock_depth(1);
        ExclusiveGuard::new(self)
    }

    /// Take the lock only if no other thread holds it.
    pub fn try_acquire(&self) -> Option<ExclusiveGuard<'_>> {
        let me = thread::current().id();
        let mut state = self.state.lock();
        match state.owner {
            Some(owner) if owner != me => None,
            _ => {
                state.owner = Some(me);
                state.depth += 1;
                Some(ExclusiveGuard::new(self))
            }
        }
    }

    pub fn is_locked(&self) -> bool {
        self.state.lock().owner.is_some()
    }

    pub fn is_held_by_current_thread(&self) -> bool {
        self.state.lock().owner == Some(thread::current().id())
    }

    /// Levels held by the calling thread.
    pub fn depth(&self) -> usize {
        let state = self.state.lock();
        if state.owner == Some(thread::current().id()) {
            state.depth
        } else {
            0
        }
    }

    fn lock_depth(&self, levels: usize) {
        let me = thread::current().id();
        let mut state = self.state.lock();
        while let Some(owner) = state.owner
            && owner != me
        {
            self.released.wait(&mut state);
        }
        state.owner = Some(me);
        state.depth += levels;
    }

    fn release_one(&self) {
        let mut state = self.state.lock();
        state.depth = state.depth.saturating_sub(1);
        if state.depth == 0 {
            state.owner = None;
            self.released.notify_all();
        }
    }

    /// Release every level the calling thread holds, returning how many.
    fn release_all(&self) -> usize {
        let mut state = self.state.lock();
        let depth = state.depth;
        state.depth = 0;
        state.owner = None;
        self.released.notify_all();
        depth
    }
}

/// Proof that the current thread holds the [`ExclusivityLock`].
///
/// Not `Send`: a guard must be dropped on the thread that took it.
#[derive(Debug)]
pub struct ExclusiveGuard<'a> {
    lock: &'a ExclusivityLock,
    _not_send: PhantomData<*const ()>,
}

impl<'a> ExclusiveGuard<'a> {
    fn new(lock: &'a ExclusivityLock) -> Self {
        Self {
            lock,
            _not_send: PhantomData,
        }
    }

    pub fn lock(&self) -> &'a ExclusivityLock {
        self.lock
    }

    /// Run `f` with the lock fully released, then take it back at the same depth.
    ///
    /// The lock is reacquired even if `f` panics.
    pub fn unlocked<R>(&self, f: impl FnOnce() -> R) -> R {
        let depth = self.lock.release_all();
        let _restore = Reacquire {
            lock: self.lock,
            depth,
        };
        f()
    }
}

impl Drop for ExclusiveGuard<'_> {
    fn drop(&mut self) {
        self.lock.release_one();
    }
}

struct Reacquire<'a> {
    lock: &'a ExclusivityLock,
    depth: usize,
}

impl Drop for Reacquire<'_> {
    fn drop(&mut self) {
        self.lock.lock_depth(self.depth);
    }
}
