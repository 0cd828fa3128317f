//! A minimal in-memory source store for driving the adapter in tests.

#![allow(dead_code)]

use std::convert::Infallible;
use std::sync::Arc;

use parking_lot::Mutex;
use tether_core::{Listener, SourceStore, Unsubscribe, Value};

struct AtomState {
    value: Value,
    next_id: u64,
    listeners: Vec<(u64, Arc<dyn Fn(&Value) + Send + Sync>)>,
    unsubscribes: usize,
    /// Keep delivering to listeners after they unsubscribe.
    leaky: bool,
}

/// Holds one value and notifies listeners synchronously on `set`.
#[derive(Clone)]
pub struct Atom {
    state: Arc<Mutex<AtomState>>,
}

impl Atom {
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            state: Arc::new(Mutex::new(AtomState {
                value: value.into(),
                next_id: 0,
                listeners: Vec::new(),
                unsubscribes: 0,
                leaky: false,
            })),
        }
    }

    /// An atom whose unsubscribe handle is counted but does not detach the
    /// listener, like a store with notifications already queued.
    pub fn leaky(value: impl Into<Value>) -> Self {
        let atom = Self::new(value);
        atom.state.lock().leaky = true;
        atom
    }

    pub fn json(value: serde_json::Value) -> Self {
        Self::new(Value::from(value))
    }

    pub fn set(&self, value: impl Into<Value>) {
        let value = value.into();
        let listeners: Vec<_> = {
            let mut state = self.state.lock();
            state.value = value.clone();
            state.listeners.iter().map(|(_, l)| l.clone()).collect()
        };
        for listener in listeners {
            listener(&value);
        }
    }

    pub fn set_json(&self, value: serde_json::Value) {
        self.set(Value::from(value));
    }

    pub fn listener_count(&self) -> usize {
        self.state.lock().listeners.len()
    }

    pub fn unsubscribe_count(&self) -> usize {
        self.state.lock().unsubscribes
    }
}

impl SourceStore for Atom {
    type Error = Infallible;

    fn get(&self) -> Result<Value, Infallible> {
        Ok(self.state.lock().value.clone())
    }

    fn subscribe(&self, listener: Listener) -> Result<Unsubscribe, Infallible> {
        let mut state = self.state.lock();
        let id = state.next_id;
        state.next_id += 1;
        state.listeners.push((id, Arc::from(listener)));

        let handle = Arc::clone(&self.state);
        Ok(Box::new(move || {
            let mut state = handle.lock();
            if !state.leaky {
                state.listeners.retain(|(other, _)| *other != id);
            }
            state.unsubscribes += 1;
        }))
    }
}

pub fn obj(value: serde_json::Value) -> Value {
    Value::from(value)
}
