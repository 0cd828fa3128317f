//! Store nodes.
//!
//! A [`StoreNode`] is the reactive counterpart of one object or array inside
//! a [`ReactiveStore`](super::ReactiveStore). Each field (or index) lives in
//! a slot with its own trigger; the node's key set (or length) has one more.
//! Nested objects and arrays become child nodes, so reading
//! `node.get("a")` depends on field `a` and nothing else.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::{RwLock, RwLockWriteGuard};

use crate::reactive::Trigger;
use crate::value::Value;

/// Container kind of a [`StoreNode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Object,
    Array,
}

pub(crate) struct Slot {
    pub(crate) trigger: Trigger,
    pub(crate) value: StoreValue,
}

impl Slot {
    pub(crate) fn new(value: &Value) -> Self {
        Self {
            trigger: Trigger::new(),
            value: StoreValue::build(value),
        }
    }
}

pub(crate) enum Slots {
    Object(IndexMap<String, Slot>),
    Array(Vec<Slot>),
}

struct NodeInner {
    /// Notified when keys are added or removed, or the length changes.
    shape: Trigger,
    slots: RwLock<Slots>,
}

/// A reactive object or array.
///
/// Clones share the node; equality is identity.
#[derive(Clone)]
pub struct StoreNode {
    inner: Arc<NodeInner>,
}

impl StoreNode {
    /// Build a node tree for a structured value. `None` for primitives.
    pub(crate) fn build(value: &Value) -> Option<Self> {
        let slots = match value {
            Value::Object(fields) => Slots::Object(
                fields
                    .iter()
                    .map(|(key, value)| (key.clone(), Slot::new(value)))
                    .collect(),
            ),
            Value::Array(items) => Slots::Array(items.iter().map(Slot::new).collect()),
            _ => return None,
        };

        Some(Self {
            inner: Arc::new(NodeInner {
                shape: Trigger::new(),
                slots: RwLock::new(slots),
            }),
        })
    }

    pub fn kind(&self) -> NodeKind {
        match &*self.inner.slots.read() {
            Slots::Object(_) => NodeKind::Object,
            Slots::Array(_) => NodeKind::Array,
        }
    }

    /// Whether `value` can be reconciled into this node in place.
    pub(crate) fn accepts(&self, value: &Value) -> bool {
        matches!(
            (self.kind(), value),
            (NodeKind::Object, Value::Object(_)) | (NodeKind::Array, Value::Array(_))
        )
    }

    /// Read an object field.
    ///
    /// Tracks the field, or the key set when the field is absent so the
    /// reader re-runs once it appears.
    pub fn get(&self, key: &str) -> Option<StoreValue> {
        let found = match &*self.inner.slots.read() {
            Slots::Object(fields) => fields
                .get(key)
                .map(|slot| (slot.trigger.clone(), slot.value.clone())),
            Slots::Array(_) => None,
        };

        match found {
            Some((trigger, value)) => {
                trigger.track();
                Some(value)
            }
            None => {
                self.inner.shape.track();
                None
            }
        }
    }

    /// Read an array element. Tracks like [`get`](Self::get).
    pub fn at(&self, index: usize) -> Option<StoreValue> {
        let found = match &*self.inner.slots.read() {
            Slots::Array(items) => items
                .get(index)
                .map(|slot| (slot.trigger.clone(), slot.value.clone())),
            Slots::Object(_) => None,
        };

        match found {
            Some((trigger, value)) => {
                trigger.track();
                Some(value)
            }
            None => {
                self.inner.shape.track();
                None
            }
        }
    }

    /// Number of fields or elements. Tracks the key set.
    pub fn len(&self) -> usize {
        self.inner.shape.track();
        match &*self.inner.slots.read() {
            Slots::Object(fields) => fields.len(),
            Slots::Array(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Field names of an object (empty for arrays). Tracks the key set.
    pub fn keys(&self) -> Vec<String> {
        self.inner.shape.track();
        match &*self.inner.slots.read() {
            Slots::Object(fields) => fields.keys().cloned().collect(),
            Slots::Array(_) => Vec::new(),
        }
    }

    /// Materialize the whole subtree, tracking every part of it.
    pub fn to_value(&self) -> Value {
        self.materialize(true)
    }

    /// Materialize the whole subtree without tracking.
    pub fn snapshot(&self) -> Value {
        self.materialize(false)
    }

    /// Untracked read of a plain object field.
    pub(crate) fn peek(&self, key: &str) -> Option<Value> {
        match &*self.inner.slots.read() {
            Slots::Object(fields) => fields.get(key).and_then(|slot| slot.value.as_plain().cloned()),
            Slots::Array(_) => None,
        }
    }

    pub fn ptr_eq(&self, other: &StoreNode) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn shape_trigger(&self) -> &Trigger {
        &self.inner.shape
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, Slots> {
        self.inner.slots.write()
    }

    fn materialize(&self, tracked: bool) -> Value {
        if tracked {
            self.inner.shape.track();
        }

        // Collect first so no lock is held while tracking children.
        let (fields, items) = match &*self.inner.slots.read() {
            Slots::Object(fields) => (
                Some(
                    fields
                        .iter()
                        .map(|(key, slot)| (key.clone(), slot.trigger.clone(), slot.value.clone()))
                        .collect::<Vec<_>>(),
                ),
                None,
            ),
            Slots::Array(items) => (
                None,
                Some(
                    items
                        .iter()
                        .map(|slot| (slot.trigger.clone(), slot.value.clone()))
                        .collect::<Vec<_>>(),
                ),
            ),
        };

        let read = |trigger: Trigger, value: StoreValue| {
            if tracked {
                trigger.track();
            }
            value.materialize(tracked)
        };

        match (fields, items) {
            (Some(fields), _) => Value::Object(
                fields
                    .into_iter()
                    .map(|(key, trigger, value)| (key, read(trigger, value)))
                    .collect(),
            ),
            (None, Some(items)) => Value::Array(
                items
                    .into_iter()
                    .map(|(trigger, value)| read(trigger, value))
                    .collect(),
            ),
            (None, None) => Value::Undefined,
        }
    }
}

impl PartialEq for StoreNode {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for StoreNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StoreNode").field(&self.snapshot()).finish()
    }
}

/// What a store read yields: a plain value or a reactive node.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreValue {
    Plain(Value),
    Node(StoreNode),
}

impl StoreValue {
    /// Wrap a value, building nodes for its structured parts.
    pub fn build(value: &Value) -> Self {
        match StoreNode::build(value) {
            Some(node) => StoreValue::Node(node),
            None => StoreValue::Plain(value.clone()),
        }
    }

    pub fn as_plain(&self) -> Option<&Value> {
        match self {
            StoreValue::Plain(value) => Some(value),
            StoreValue::Node(_) => None,
        }
    }

    pub fn as_node(&self) -> Option<&StoreNode> {
        match self {
            StoreValue::Node(node) => Some(node),
            StoreValue::Plain(_) => None,
        }
    }

    /// Field of a node value; `None` for plain values.
    pub fn get(&self, key: &str) -> Option<StoreValue> {
        self.as_node().and_then(|node| node.get(key))
    }

    /// Element of a node value; `None` for plain values.
    pub fn at(&self, index: usize) -> Option<StoreValue> {
        self.as_node().and_then(|node| node.at(index))
    }

    /// Materialize, tracking every part read.
    pub fn to_value(&self) -> Value {
        self.materialize(true)
    }

    /// Materialize without tracking.
    pub fn snapshot(&self) -> Value {
        self.materialize(false)
    }

    fn materialize(&self, tracked: bool) -> Value {
        match self {
            StoreValue::Plain(value) => value.clone(),
            StoreValue::Node(node) => node.materialize(tracked),
        }
    }
}
