//! Reconciliation
//!
//! Patches a node tree in place so it matches a new value, touching only
//! what differs:
//!
//! - Equal primitive leaves are left alone and do not notify.
//! - Changed leaves are replaced and their slot notifies.
//! - Objects recurse per key. Added and removed keys notify the node's key
//!   set; removed slots also notify their own readers.
//! - Arrays match elements by the configured identity key, so moved
//!   elements keep their node. Elements without a key pair up with a keyless
//!   element at the same index. With no key configured arrays recurse per
//!   index.
//! - A child whose container kind or identity key changes is rebuilt.
//!
//! Triggers to fire are collected into `pending` and fired by the caller once
//! the whole tree is consistent.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::node::{Slot, Slots, StoreNode, StoreValue};
use crate::reactive::Trigger;
use crate::value::Value;

pub(crate) type Pending = SmallVec<[Trigger; 8]>;

/// How arrays of objects are matched up during reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileOptions {
    /// Field identifying array elements across updates. `None` matches by
    /// position only.
    pub key: Option<String>,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            key: Some("id".to_string()),
        }
    }
}

impl ReconcileOptions {
    /// Match array elements by position only.
    pub fn positional() -> Self {
        Self { key: None }
    }

    /// Match array elements by the given field.
    pub fn keyed_by(key: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
        }
    }
}

/// Reconcile `node` with `next`. Returns `false` if the container kinds
/// differ and nothing was changed.
pub(crate) fn reconcile_node(
    node: &StoreNode,
    next: &Value,
    options: &ReconcileOptions,
    pending: &mut Pending,
) -> bool {
    let mut slots = node.write();
    let shape_changed = match (&mut *slots, next) {
        (Slots::Object(fields), Value::Object(next_fields)) => {
            let before = fields.len();
            fields.retain(|key, slot| {
                let keep = next_fields.contains_key(key);
                if !keep {
                    pending.push(slot.trigger.clone());
                }
                keep
            });
            let mut changed = fields.len() != before;

            for (key, value) in next_fields {
                match fields.get_mut(key) {
                    Some(slot) => update_slot(slot, value, options, pending),
                    None => {
                        fields.insert(key.clone(), Slot::new(value));
                        changed = true;
                    }
                }
            }
            changed
        }
        (Slots::Array(items), Value::Array(next_items)) => {
            let before = items.len();
            match options.key.as_deref() {
                Some(key) => reconcile_keyed(items, next_items, key, options, pending),
                None => reconcile_positional(items, next_items, options, pending),
            }
            items.len() != before
        }
        _ => return false,
    };
    drop(slots);

    if shape_changed {
        pending.push(node.shape_trigger().clone());
    }
    true
}

fn update_slot(slot: &mut Slot, next: &Value, options: &ReconcileOptions, pending: &mut Pending) {
    let unchanged = match &slot.value {
        StoreValue::Node(node) if node.accepts(next) && same_identity(node, next, options) => {
            reconcile_node(node, next, options, pending)
        }
        StoreValue::Node(_) => false,
        StoreValue::Plain(current) => current == next,
    };

    if !unchanged {
        slot.value = StoreValue::build(next);
        pending.push(slot.trigger.clone());
    }
}

fn reconcile_positional(
    items: &mut Vec<Slot>,
    next: &[Value],
    options: &ReconcileOptions,
    pending: &mut Pending,
) {
    for (slot, value) in items.iter_mut().zip(next) {
        update_slot(slot, value, options, pending);
    }

    if next.len() > items.len() {
        let added: Vec<Slot> = next[items.len()..].iter().map(Slot::new).collect();
        items.extend(added);
    } else {
        for slot in items.drain(next.len()..) {
            pending.push(slot.trigger);
        }
    }
}

/// Whether `next` describes the same entity as `node`. Objects whose
/// identity keys differ are different entities even at the same place.
fn same_identity(node: &StoreNode, next: &Value, options: &ReconcileOptions) -> bool {
    let Some(key) = options.key.as_deref() else {
        return true;
    };
    let current = node.peek(key).as_ref().and_then(identity);
    let incoming = next.get(key).and_then(identity);
    match (current, incoming) {
        (Some(current), Some(incoming)) => current == incoming,
        _ => true,
    }
}

/// Match elements by identity key. Keyless elements reuse the keyless
/// element previously at their index.
fn reconcile_keyed(
    items: &mut Vec<Slot>,
    next: &[Value],
    key: &str,
    options: &ReconcileOptions,
    pending: &mut Pending,
) {
    let old_ids: Vec<Option<String>> = items
        .iter()
        .map(|slot| {
            slot.value
                .as_node()
                .and_then(|node| node.peek(key))
                .and_then(|value| identity(&value))
        })
        .collect();

    let mut by_id: HashMap<&str, usize> = HashMap::with_capacity(items.len());
    for (index, id) in old_ids.iter().enumerate() {
        if let Some(id) = id {
            by_id.entry(id.as_str()).or_insert(index);
        }
    }

    let mut previous: Vec<Option<StoreValue>> =
        items.iter().map(|slot| Some(slot.value.clone())).collect();
    let mut old_slots = std::mem::take(items).into_iter();

    for (index, value) in next.iter().enumerate() {
        let (trigger, prior) = match old_slots.next() {
            Some(slot) => (slot.trigger, Some(slot.value)),
            None => (Trigger::new(), None),
        };

        let source = match value.get(key).and_then(identity) {
            Some(id) => by_id.get(id.as_str()).copied(),
            None => matches!(old_ids.get(index), Some(None)).then_some(index),
        };
        let current = match source.and_then(|i| previous[i].take()) {
            Some(StoreValue::Node(node)) if node.accepts(value) => {
                reconcile_node(&node, value, options, pending);
                StoreValue::Node(node)
            }
            Some(StoreValue::Plain(plain)) if plain == *value => StoreValue::Plain(plain),
            _ => StoreValue::build(value),
        };

        if prior.is_some_and(|prior| prior != current) {
            pending.push(trigger.clone());
        }
        items.push(Slot {
            trigger,
            value: current,
        });
    }

    for slot in old_slots {
        pending.push(slot.trigger);
    }
}

/// Stable string form of an identity key value.
fn identity(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(format!("s:{s}")),
        Value::Number(n) => Some(format!("n:{n}")),
        Value::Bool(b) => Some(format!("b:{b}")),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn build(json: serde_json::Value) -> StoreNode {
        StoreNode::build(&Value::from(json)).unwrap()
    }

    fn apply(node: &StoreNode, json: serde_json::Value, options: &ReconcileOptions) -> Pending {
        let mut pending = Pending::new();
        assert!(reconcile_node(node, &Value::from(json), options, &mut pending));
        pending
    }

    fn trigger_of(node: &StoreNode, key: &str) -> Trigger {
        match &*node.write() {
            Slots::Object(fields) => fields[key].trigger.clone(),
            Slots::Array(_) => panic!("not an object"),
        }
    }

    #[test]
    fn changed_leaf_notifies_only_its_slot() {
        let root = build(json!({"a": 1, "b": 2}));
        let b = trigger_of(&root, "b");

        let pending = apply(&root, json!({"a": 1, "b": 3}), &ReconcileOptions::default());

        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id(), b.id());
        assert_eq!(root.snapshot(), Value::from(json!({"a": 1, "b": 3})));
    }

    #[test]
    fn identical_value_notifies_nothing() {
        let root = build(json!({"a": {"b": [1, 2, {"c": true}]}}));
        let pending = apply(&root, json!({"a": {"b": [1, 2, {"c": true}]}}), &ReconcileOptions::default());
        assert!(pending.is_empty());
    }

    #[test]
    fn nested_objects_keep_identity() {
        let root = build(json!({"user": {"name": "ada", "age": 36}}));
        let user = root.get("user").unwrap();

        let pending = apply(
            &root,
            json!({"user": {"name": "ada", "age": 37}}),
            &ReconcileOptions::default(),
        );

        assert_eq!(pending.len(), 1);
        assert_eq!(root.get("user"), Some(user));
    }

    #[test]
    fn added_and_removed_keys_notify_the_key_set() {
        let root = build(json!({"a": 1, "b": 2}));
        let a = trigger_of(&root, "a");

        let pending = apply(&root, json!({"b": 2, "c": 3}), &ReconcileOptions::default());
        let ids: Vec<_> = pending.iter().map(Trigger::id).collect();

        assert!(ids.contains(&a.id()));
        assert!(ids.contains(&root.shape_trigger().id()));
        assert_eq!(root.keys().len(), 2);
        assert!(root.get("a").is_none());
    }

    #[test]
    fn kind_change_rebuilds_the_child() {
        let root = build(json!({"v": {"x": 1}}));
        let before = root.get("v").unwrap();

        let pending = apply(&root, json!({"v": [1]}), &ReconcileOptions::default());

        assert_eq!(pending.len(), 1);
        assert_ne!(root.get("v"), Some(before));
        assert_eq!(root.snapshot(), Value::from(json!({"v": [1]})));
    }

    #[test]
    fn mismatched_root_is_rejected() {
        let root = build(json!([1]));
        let mut pending = Pending::new();
        assert!(!reconcile_node(&root, &Value::from(json!({"a": 1})), &ReconcileOptions::default(), &mut pending));
        assert!(pending.is_empty());
    }

    #[test]
    fn appending_leaves_existing_elements_alone() {
        let root = build(json!([1, 2, 3]));
        let pending = apply(&root, json!([1, 2, 3, 4]), &ReconcileOptions::default());

        // Only the length changed
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id(), root.shape_trigger().id());
        assert_eq!(root.len(), 4);
    }

    #[test]
    fn truncating_notifies_removed_elements() {
        let root = build(json!([1, 2, 3]));
        let pending = apply(&root, json!([1]), &ReconcileOptions::default());

        assert_eq!(pending.len(), 3);
        assert_eq!(root.snapshot(), Value::from(json!([1])));
    }

    #[test]
    fn keyed_arrays_follow_moved_elements() {
        let root = build(json!([{"id": 1, "v": "a"}, {"id": 2, "v": "b"}]));
        let first = root.at(0).unwrap();
        let second = root.at(1).unwrap();

        apply(
            &root,
            json!([{"id": 2, "v": "b"}, {"id": 1, "v": "a!"}]),
            &ReconcileOptions::default(),
        );

        assert_eq!(root.at(0), Some(second));
        assert_eq!(root.at(1), Some(first.clone()));
        assert_eq!(first.get("v"), Some(StoreValue::Plain(Value::from("a!"))));
    }

    #[test]
    fn positional_arrays_patch_in_place() {
        let root = build(json!([{"id": 1, "v": "a"}, {"id": 2, "v": "b"}]));
        let first = root.at(0).unwrap();

        apply(
            &root,
            json!([{"id": 2, "v": "b"}, {"id": 1, "v": "a"}]),
            &ReconcileOptions::positional(),
        );

        assert_eq!(root.at(0), Some(first.clone()));
        assert_eq!(first.get("id"), Some(StoreValue::Plain(Value::from(2))));
    }

    #[test]
    fn keyless_elements_fall_back_to_positions() {
        let root = build(json!([{"id": 1}, {"name": "no id"}]));
        let first = root.at(0).unwrap();

        apply(&root, json!([{"id": 1}, {"name": "still none"}]), &ReconcileOptions::default());

        assert_eq!(root.at(0), Some(first));
    }

    #[test]
    fn changed_identity_rebuilds_the_child() {
        let root = build(json!({"selected": {"id": 1, "v": "a"}}));
        let before = root.get("selected").unwrap();

        let pending = apply(
            &root,
            json!({"selected": {"id": 2, "v": "a"}}),
            &ReconcileOptions::default(),
        );

        assert_eq!(pending.len(), 1);
        assert_ne!(root.get("selected"), Some(before.clone()));
        // The old handle still describes entity 1
        assert_eq!(before.get("id"), Some(StoreValue::Plain(Value::from(1))));
    }

    #[test]
    fn same_identity_patches_the_child_in_place() {
        let root = build(json!({"selected": {"id": 1, "v": "a"}}));
        let before = root.get("selected").unwrap();

        apply(
            &root,
            json!({"selected": {"id": 1, "v": "b"}}),
            &ReconcileOptions::default(),
        );

        assert_eq!(root.get("selected"), Some(before.clone()));
        assert_eq!(before.get("v"), Some(StoreValue::Plain(Value::from("b"))));
    }

    #[test]
    fn keyed_elements_move_past_keyless_ones() {
        let root = build(json!([{"id": 1}, {"id": 2}, {"note": "x"}]));
        let first = root.at(0).unwrap();
        let second = root.at(1).unwrap();
        let note = root.at(2).unwrap();

        apply(
            &root,
            json!([{"id": 2}, {"id": 1}, {"note": "y"}]),
            &ReconcileOptions::default(),
        );

        assert_eq!(root.at(0), Some(second));
        assert_eq!(root.at(1), Some(first.clone()));
        assert_eq!(root.at(2), Some(note.clone()));
        assert_eq!(first.get("id"), Some(StoreValue::Plain(Value::from(1))));
        assert_eq!(note.get("note"), Some(StoreValue::Plain(Value::from("y"))));
    }

    #[test]
    fn keyless_element_does_not_take_over_a_keyed_one() {
        let root = build(json!([{"id": 1, "v": "a"}]));
        let first = root.at(0).unwrap();

        apply(&root, json!([{"v": "b"}]), &ReconcileOptions::default());

        assert_ne!(root.at(0), Some(first.clone()));
        assert_eq!(first.get("v"), Some(StoreValue::Plain(Value::from("a"))));
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let options: ReconcileOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options, ReconcileOptions::keyed_by("id"));

        let options: ReconcileOptions = serde_json::from_str(r#"{"key": null}"#).unwrap();
        assert_eq!(options, ReconcileOptions::positional());
    }
}
