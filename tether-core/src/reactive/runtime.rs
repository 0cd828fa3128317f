//! Reactive Runtime
//!
//! The runtime is the central coordinator that connects sources (signals,
//! triggers, memos) to subscribers (memos, effects). It owns the dependency
//! edges and propagates change notifications.
//!
//! # How It Works
//!
//! 1. Memos and effects register with the runtime when they are created.
//!
//! 2. When a computation reads a source inside its tracking context, the
//!    runtime records the edge.
//!
//! 3. When a source changes, the runtime:
//!    a. Finds all dependent subscribers, in the order they subscribed
//!    b. Marks them as "maybe dirty"
//!    c. Schedules the eager ones (effects, and memos somebody observes)
//!
//! 4. Inside [`Runtime::batch`] step 3c is deferred until the outermost batch
//!    ends, and each subscriber is scheduled at most once.
//!
//! # Thread Safety
//!
//! Tracking and batching state are thread-local. The registry and the edge
//! table are global so sources can be shared across threads. No runtime lock
//! is held while a subscriber runs.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, OnceLock, Weak};

use indexmap::{IndexMap, IndexSet};
use parking_lot::RwLock;

use super::context::ReactiveContext;
use super::subscriber::{SourceId, SubscriberId};

/// A trait for types that can be notified when dependencies change.
pub trait Reactive: Send + Sync {
    /// Get the subscriber ID for this reactive value.
    fn subscriber_id(&self) -> SubscriberId;

    /// Mark this reactive value as potentially needing update.
    fn mark_maybe_dirty(&self);

    /// Bring this reactive value up to date.
    fn schedule(&self);

    /// Whether the value should be scheduled on change (effects, observed
    /// memos) or left to refresh lazily on next read.
    fn is_eager(&self) -> bool;
}

/// Handle to a registered reactive value.
///
/// Dropping this handle unregisters the reactive value from the runtime.
pub struct ReactiveHandle {
    subscriber_id: SubscriberId,
}

impl ReactiveHandle {
    pub fn subscriber_id(&self) -> SubscriberId {
        self.subscriber_id
    }
}

impl Drop for ReactiveHandle {
    fn drop(&mut self) {
        Runtime::unregister(self.subscriber_id);
    }
}

/// The global reactive runtime.
pub struct Runtime;

/// Dependency edges, indexed in both directions.
#[derive(Default)]
struct Edges {
    by_source: HashMap<SourceId, IndexSet<SubscriberId>>,
    by_subscriber: HashMap<SubscriberId, HashSet<SourceId>>,
}

impl Edges {
    fn remove_subscriber(&mut self, subscriber_id: SubscriberId) {
        let Some(sources) = self.by_subscriber.remove(&subscriber_id) else {
            return;
        };
        for source in sources {
            if let Some(subs) = self.by_source.get_mut(&source) {
                subs.shift_remove(&subscriber_id);
                if subs.is_empty() {
                    self.by_source.remove(&source);
                }
            }
        }
    }

    fn remove_source(&mut self, source: SourceId) {
        let Some(subs) = self.by_source.remove(&source) else {
            return;
        };
        for subscriber_id in subs {
            if let Some(sources) = self.by_subscriber.get_mut(&subscriber_id) {
                sources.remove(&source);
            }
        }
    }
}

// Maps subscriber IDs to weak references so the registry never keeps a
// computation alive.
static REGISTRY: OnceLock<RwLock<HashMap<SubscriberId, Weak<dyn Reactive>>>> = OnceLock::new();
static EDGES: OnceLock<RwLock<Edges>> = OnceLock::new();

thread_local! {
    static BATCH_DEPTH: Cell<usize> = const { Cell::new(0) };
    static PENDING: RefCell<IndexMap<SubscriberId, Arc<dyn Reactive>>> =
        RefCell::new(IndexMap::new());
}

fn get_registry() -> &'static RwLock<HashMap<SubscriberId, Weak<dyn Reactive>>> {
    REGISTRY.get_or_init(|| RwLock::new(HashMap::new()))
}

fn get_edges() -> &'static RwLock<Edges> {
    EDGES.get_or_init(|| RwLock::new(Edges::default()))
}

/// Decrements the batch depth on drop, including during unwinding.
struct BatchGuard;

impl BatchGuard {
    fn enter() -> Self {
        BATCH_DEPTH.with(|depth| depth.set(depth.get() + 1));
        Self
    }
}

impl Drop for BatchGuard {
    fn drop(&mut self) {
        BATCH_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

impl Runtime {
    /// Register a reactive value with the runtime.
    ///
    /// Returns a handle that unregisters the value when dropped.
    pub fn register(reactive: Arc<dyn Reactive>) -> ReactiveHandle {
        let id = reactive.subscriber_id();

        get_registry().write().insert(id, Arc::downgrade(&reactive));

        ReactiveHandle { subscriber_id: id }
    }

    fn unregister(id: SubscriberId) {
        get_registry().write().remove(&id);
        get_edges().write().remove_subscriber(id);
    }

    /// Record a read of `source` by the current computation, if any.
    pub fn track(source: SourceId) {
        if let Some(subscriber_id) = ReactiveContext::current_subscriber() {
            ReactiveContext::track_dependency(source);
            Self::add_dependency(source, subscriber_id);
        }
    }

    /// Record that a subscriber depends on a source.
    pub fn add_dependency(source: SourceId, subscriber_id: SubscriberId) {
        let mut edges = get_edges().write();
        edges.by_source.entry(source).or_default().insert(subscriber_id);
        edges.by_subscriber.entry(subscriber_id).or_default().insert(source);
    }

    /// Remove all dependencies for a subscriber.
    ///
    /// Called before re-running a computation to clear stale dependencies.
    pub fn clear_dependencies(subscriber_id: SubscriberId) {
        get_edges().write().remove_subscriber(subscriber_id);
    }

    /// Forget a source that no longer exists.
    pub fn release_source(source: SourceId) {
        get_edges().write().remove_source(source);
    }

    /// Number of subscribers currently depending on `source`.
    pub fn subscriber_count(source: SourceId) -> usize {
        get_edges()
            .read()
            .by_source
            .get(&source)
            .map_or(0, IndexSet::len)
    }

    /// Notify all subscribers that a source changed.
    ///
    /// This is the core update propagation mechanism.
    pub fn notify_source_change(source: SourceId) {
        let subscriber_ids: Vec<SubscriberId> = {
            let edges = get_edges().read();
            match edges.by_source.get(&source) {
                Some(subs) => subs.iter().copied().collect(),
                None => return,
            }
        };

        let reactives: Vec<Arc<dyn Reactive>> = {
            let registry = get_registry().read();
            subscriber_ids
                .iter()
                .filter_map(|id| registry.get(id))
                .filter_map(Weak::upgrade)
                .collect()
        };

        let mut eager = Vec::new();
        for reactive in reactives {
            reactive.mark_maybe_dirty();
            if reactive.is_eager() {
                eager.push(reactive);
            }
        }

        if Self::is_batching() {
            PENDING.with(|pending| {
                let mut pending = pending.borrow_mut();
                for reactive in eager {
                    pending.entry(reactive.subscriber_id()).or_insert(reactive);
                }
            });
        } else {
            for reactive in eager {
                reactive.schedule();
            }
        }
    }

    /// Run `f` with scheduling deferred until the outermost batch ends.
    pub fn batch<R>(f: impl FnOnce() -> R) -> R {
        let result = {
            let _guard = BatchGuard::enter();
            f()
        };

        if !Self::is_batching() {
            Self::flush();
        }

        result
    }

    /// Whether a batch is open on this thread.
    pub fn is_batching() -> bool {
        BATCH_DEPTH.with(|depth| depth.get() > 0)
    }

    fn flush() {
        loop {
            let queued: Vec<Arc<dyn Reactive>> = PENDING.with(|pending| {
                pending.borrow_mut().drain(..).map(|(_, reactive)| reactive).collect()
            });
            if queued.is_empty() {
                break;
            }
            for reactive in queued {
                reactive.schedule();
            }
        }
    }

    /// Get the current subscriber being tracked, if any.
    pub fn current_subscriber() -> Option<SubscriberId> {
        ReactiveContext::current_subscriber()
    }

    /// Check if we're inside a reactive context.
    pub fn is_tracking() -> bool {
        ReactiveContext::is_active()
    }
}
