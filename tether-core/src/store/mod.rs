//! Structured Reactive Store
//!
//! A [`ReactiveStore`] holds an object or array as a tree of
//! [`StoreNode`]s whose fields are individually reactive. New values are
//! applied with [`ReactiveStore::reconcile`], which patches the tree
//! field by field so that readers of unchanged fields are not disturbed and
//! unchanged nested nodes keep their identity.
//!
//! The root itself sits in a [`Signal`]. It is only replaced when a new
//! value cannot be reconciled into the current root (the container kind
//! changed, or the value is primitive), or on an explicit
//! [`ReactiveStore::replace`].

mod node;
mod reconcile;

pub use node::{NodeKind, StoreNode, StoreValue};
pub use reconcile::ReconcileOptions;

use std::sync::Arc;

use crate::reactive::{Runtime, Signal};
use crate::value::Value;

use reconcile::{reconcile_node, Pending};

/// A reactive tree mirroring a structured value.
#[derive(Clone)]
pub struct ReactiveStore {
    root: Signal<StoreValue>,
    options: Arc<ReconcileOptions>,
}

impl ReactiveStore {
    pub fn new(initial: &Value) -> Self {
        Self::with_options(initial, ReconcileOptions::default())
    }

    pub fn with_options(initial: &Value, options: ReconcileOptions) -> Self {
        Self {
            root: Signal::new(StoreValue::build(initial)),
            options: Arc::new(options),
        }
    }

    pub fn options(&self) -> &ReconcileOptions {
        &self.options
    }

    /// The root, tracked. Reading fields of a node root tracks those fields.
    pub fn get(&self) -> StoreValue {
        self.root.get()
    }

    pub fn get_untracked(&self) -> StoreValue {
        self.root.get_untracked()
    }

    /// Untracked copy of the whole tree.
    pub fn snapshot(&self) -> Value {
        self.root.get_untracked().snapshot()
    }

    /// Patch the tree to match `next`, notifying only what changed.
    ///
    /// All notifications go out in one batch after the tree is consistent.
    pub fn reconcile(&self, next: &Value) {
        Runtime::batch(|| {
            let mut pending = Pending::new();

            match self.root.get_untracked() {
                StoreValue::Node(node) if reconcile_node(&node, next, &self.options, &mut pending) => {}
                StoreValue::Plain(current) if current == *next => {}
                StoreValue::Node(node) => {
                    tracing::warn!(
                        from = ?node.kind(),
                        to = ?next.shape(),
                        "store root changed shape; replacing it"
                    );
                    self.root.set(StoreValue::build(next));
                }
                StoreValue::Plain(_) => self.root.set(StoreValue::build(next)),
            }

            tracing::trace!(notified = pending.len(), "reconciled store");
            for trigger in pending {
                trigger.notify();
            }
        });
    }

    /// Rebuild the tree from `next` without diffing.
    ///
    /// Every reader of the root is notified and every node is new.
    pub fn replace(&self, next: &Value) {
        self.root.set(StoreValue::build(next));
    }
}

impl std::fmt::Debug for ReactiveStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReactiveStore")
            .field("root", &self.snapshot())
            .field("options", &self.options)
            .finish()
    }
}
