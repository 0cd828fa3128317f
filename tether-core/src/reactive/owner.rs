//! Reactive Owners
//!
//! An owner is a scope that collects teardown work: cleanup callbacks,
//! effects created inside it, and child owners. Disposing the owner runs all
//! of it once.
//!
//! The active owner is tracked on a thread-local stack, the same way
//! [`ReactiveContext`](super::ReactiveContext) tracks the running computation.
//! [`Owner::run`] pushes it for the duration of a closure.
//!
//! Cleanups run in reverse registration order, after the owner's children
//! have been disposed.

use std::cell::RefCell;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{Error, Result};

type Cleanup = Box<dyn FnOnce() + Send>;

thread_local! {
    static OWNER_STACK: RefCell<Vec<Owner>> = const { RefCell::new(Vec::new()) };
}

fn next_owner_id() -> u64 {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    COUNTER.fetch_add(1, Ordering::Relaxed)
}

struct OwnerInner {
    id: u64,
    cleanups: Mutex<Vec<Cleanup>>,
    children: Mutex<Vec<Owner>>,
    disposed: AtomicBool,
}

/// A scope that owns cleanups and child scopes.
///
/// # Example
///
/// ```rust
/// use tether_core::reactive::{on_cleanup, Owner};
///
/// let owner = Owner::new();
/// owner.run(|| on_cleanup(|| println!("torn down"))).unwrap();
/// owner.dispose(); // Prints: "torn down"
/// ```
#[derive(Clone)]
pub struct Owner {
    inner: Arc<OwnerInner>,
}

/// Pops the owner stack on drop.
struct OwnerGuard;

impl Drop for OwnerGuard {
    fn drop(&mut self) {
        OWNER_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

impl Owner {
    /// Create a detached root owner.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(OwnerInner {
                id: next_owner_id(),
                cleanups: Mutex::new(Vec::new()),
                children: Mutex::new(Vec::new()),
                disposed: AtomicBool::new(false),
            }),
        }
    }

    /// Create an owner that is disposed together with `self`.
    pub fn child(&self) -> Self {
        let child = Self::new();
        if self.is_disposed() {
            child.dispose();
        } else {
            self.inner.children.lock().push(child.clone());
        }
        child
    }

    /// The innermost active owner on this thread.
    pub fn current() -> Option<Owner> {
        OWNER_STACK.with(|stack| stack.borrow().last().cloned())
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Run `f` with this owner active.
    pub fn run<R>(&self, f: impl FnOnce() -> R) -> R {
        OWNER_STACK.with(|stack| stack.borrow_mut().push(self.clone()));
        let _guard = OwnerGuard;
        f()
    }

    /// Register a callback to run when this owner is disposed.
    pub fn on_cleanup(&self, cleanup: impl FnOnce() + Send + 'static) -> Result<()> {
        if self.is_disposed() {
            return Err(Error::OwnerDisposed);
        }
        self.inner.cleanups.lock().push(Box::new(cleanup));
        Ok(())
    }

    /// Dispose children, then run cleanups newest first. Later calls do
    /// nothing.
    pub fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::SeqCst) {
            return;
        }

        let children = std::mem::take(&mut *self.inner.children.lock());
        for child in children.iter().rev() {
            child.dispose();
        }

        let cleanups = std::mem::take(&mut *self.inner.cleanups.lock());
        let count = cleanups.len();
        for cleanup in cleanups.into_iter().rev() {
            cleanup();
        }

        tracing::debug!(owner = self.inner.id, cleanups = count, "owner disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    /// Number of cleanups waiting for disposal.
    pub fn cleanup_count(&self) -> usize {
        self.inner.cleanups.lock().len()
    }
}

impl Default for Owner {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Owner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Owner")
            .field("id", &self.inner.id)
            .field("cleanups", &self.cleanup_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Register a cleanup on the current owner.
///
/// Fails with [`Error::NoOwner`] outside [`Owner::run`].
pub fn on_cleanup(cleanup: impl FnOnce() + Send + 'static) -> Result<()> {
    Owner::current().ok_or(Error::NoOwner)?.on_cleanup(cleanup)
}
