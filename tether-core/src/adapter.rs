//! Store Adapter
//!
//! Mirrors a [`SourceStore`] into the reactive graph.
//!
//! # How It Works
//!
//! 1. The store's current value is read and classified once.
//!
//! 2. A primitive value is mirrored by [`Strategy::Direct`]: a signal
//!    overwritten with every emission.
//!
//! 3. A structured value is mirrored by [`Strategy::Reconcile`]: a
//!    [`ReactiveStore`] patched field by field with every emission, read
//!    through a memo so repeated reads return the same root node.
//!
//! 4. The listener is registered with the store and the resulting
//!    [`Subscription`] is either bound to the current [`Owner`]
//!    ([`use_store`]) or handed to the caller ([`bind_store`]).
//!
//! The strategy is fixed at creation. A structured mirror that later
//! receives a value of another shape replaces its root and keeps working
//! with coarser updates; a primitive mirror stores whatever it receives.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::reactive::{Memo, Owner, ReadSignal, Signal};
use crate::source::{Listener, SourceStore, Unsubscribe};
use crate::store::{ReactiveStore, ReconcileOptions, StoreValue};
use crate::value::{Shape, Value};

/// Settings for one adapter call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UseStoreOptions {
    /// Array matching for structured mirrors.
    pub reconcile: ReconcileOptions,

    /// Name attached to this mirror's log events.
    pub label: Option<String>,
}

impl UseStoreOptions {
    pub fn labeled(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Self::default()
        }
    }
}

/// How an adapter mirrors its store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Replace the whole value on every emission.
    Direct,
    /// Reconcile every emission into a field-level reactive tree.
    Reconcile,
}

impl From<Shape> for Strategy {
    fn from(shape: Shape) -> Self {
        match shape {
            Shape::Primitive => Strategy::Direct,
            Shape::Structured => Strategy::Reconcile,
        }
    }
}

#[derive(Clone)]
enum Mirror {
    Direct(ReadSignal<Value>),
    Reconcile(Memo<StoreValue>),
}

/// Read-only handle on a mirrored store value.
///
/// Reading it inside an effect or memo makes that computation depend on the
/// value. For structured mirrors [`get`](Self::get) returns the root node;
/// reading individual fields from it depends on those fields only.
#[derive(Clone)]
pub struct StoreAccessor {
    mirror: Mirror,
}

impl StoreAccessor {
    pub fn strategy(&self) -> Strategy {
        match self.mirror {
            Mirror::Direct(_) => Strategy::Direct,
            Mirror::Reconcile(_) => Strategy::Reconcile,
        }
    }

    /// The latest mirrored value, tracked.
    pub fn get(&self) -> StoreValue {
        match &self.mirror {
            Mirror::Direct(cell) => StoreValue::Plain(cell.get()),
            Mirror::Reconcile(root) => root.get(),
        }
    }

    pub fn get_untracked(&self) -> StoreValue {
        match &self.mirror {
            Mirror::Direct(cell) => StoreValue::Plain(cell.get_untracked()),
            Mirror::Reconcile(root) => root.get_untracked(),
        }
    }

    /// The latest value as a plain [`Value`], tracking every part of it.
    pub fn value(&self) -> Value {
        self.get().to_value()
    }

    /// Untracked copy of the latest value.
    pub fn snapshot(&self) -> Value {
        self.get_untracked().snapshot()
    }
}

impl fmt::Debug for StoreAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreAccessor")
            .field("strategy", &self.strategy())
            .field("value", &self.snapshot())
            .finish()
    }
}

/// The live link between a source store and its mirror.
///
/// Cancelled exactly once, by [`dispose`](Self::dispose) or on drop. The
/// mirror stops following the store before the store's unsubscribe handle
/// runs, so emissions already in flight are ignored.
pub struct Subscription {
    unsubscribe: Option<Unsubscribe>,
    active: Arc<AtomicBool>,
    label: Option<String>,
}

impl Subscription {
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Cancel the subscription.
    pub fn dispose(mut self) {
        self.cancel();
    }

    fn cancel(&mut self) {
        self.active.store(false, Ordering::SeqCst);
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
            tracing::debug!(label = self.label.as_deref(), "unsubscribed from source store");
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("label", &self.label)
            .field("active", &self.is_active())
            .finish()
    }
}

/// Mirror `store` for the lifetime of the current owner.
///
/// Must run inside [`Owner::run`]; the subscription is cancelled when that
/// owner is disposed.
pub fn use_store<S>(store: &S) -> Result<StoreAccessor>
where
    S: SourceStore + ?Sized,
{
    use_store_with(store, UseStoreOptions::default())
}

/// [`use_store`] with explicit options.
pub fn use_store_with<S>(store: &S, options: UseStoreOptions) -> Result<StoreAccessor>
where
    S: SourceStore + ?Sized,
{
    let owner = Owner::current().ok_or(Error::NoOwner)?;
    if owner.is_disposed() {
        return Err(Error::OwnerDisposed);
    }

    let (accessor, subscription) = bind_store_with(store, options)?;
    owner.on_cleanup(move || subscription.dispose())?;

    Ok(accessor)
}

/// Mirror `store` until the returned [`Subscription`] is disposed or dropped.
pub fn bind_store<S>(store: &S) -> Result<(StoreAccessor, Subscription)>
where
    S: SourceStore + ?Sized,
{
    bind_store_with(store, UseStoreOptions::default())
}

/// [`bind_store`] with explicit options.
pub fn bind_store_with<S>(store: &S, options: UseStoreOptions) -> Result<(StoreAccessor, Subscription)>
where
    S: SourceStore + ?Sized,
{
    let initial = store.get().map_err(Error::from_source)?;
    let strategy = Strategy::from(Shape::of(&initial));
    let active = Arc::new(AtomicBool::new(true));
    let UseStoreOptions { reconcile, label } = options;

    let (mirror, listener): (Mirror, Listener) = match strategy {
        Strategy::Direct => {
            let cell = Signal::new(initial);
            let writer = cell.clone();
            let live = Arc::clone(&active);
            let tag = label.clone();
            let listener: Listener = Box::new(move |value: &Value| {
                if live.load(Ordering::SeqCst) {
                    tracing::trace!(label = tag.as_deref(), "mirroring emission");
                    writer.set(value.clone());
                }
            });
            (Mirror::Direct(cell.read_only()), listener)
        }
        Strategy::Reconcile => {
            let state = ReactiveStore::with_options(&initial, reconcile);
            let writer = state.clone();
            let live = Arc::clone(&active);
            let tag = label.clone();
            let listener: Listener = Box::new(move |value: &Value| {
                if live.load(Ordering::SeqCst) {
                    tracing::trace!(label = tag.as_deref(), "reconciling emission");
                    writer.reconcile(value);
                }
            });
            (Mirror::Reconcile(Memo::new(move || state.get())), listener)
        }
    };

    let unsubscribe = store.subscribe(listener).map_err(Error::from_source)?;
    tracing::debug!(?strategy, label = label.as_deref(), "subscribed to source store");

    Ok((
        StoreAccessor { mirror },
        Subscription {
            unsubscribe: Some(unsubscribe),
            active,
            label,
        },
    ))
}
