//! The external store the adapter mirrors.
//!
//! A source store exposes its current value synchronously and lets callers
//! register a listener that is invoked with every new value. The adapter
//! treats it as opaque: when and on which thread listeners run, how values
//! are compared and where they are kept is up to the store.

use std::sync::Arc;

use crate::value::Value;

/// Callback invoked with every value a source store emits.
pub type Listener = Box<dyn Fn(&Value) + Send + Sync>;

/// An owned one-shot closure that removes a listener when called.
pub type Unsubscribe = Box<dyn FnOnce() + Send + Sync>;

/// A store holding a [`Value`] and announcing changes to it.
pub trait SourceStore {
    /// Failure reported by [`get`](Self::get) or [`subscribe`](Self::subscribe).
    type Error: std::error::Error + Send + Sync + 'static;

    /// The current value.
    fn get(&self) -> Result<Value, Self::Error>;

    /// Register `listener` for future changes.
    fn subscribe(&self, listener: Listener) -> Result<Unsubscribe, Self::Error>;
}

impl<S> SourceStore for Arc<S>
where
    S: SourceStore + ?Sized,
{
    type Error = S::Error;

    fn get(&self) -> Result<Value, Self::Error> {
        (**self).get()
    }

    fn subscribe(&self, listener: Listener) -> Result<Unsubscribe, Self::Error> {
        (**self).subscribe(listener)
    }
}

impl<S> SourceStore for &S
where
    S: SourceStore + ?Sized,
{
    type Error = S::Error;

    fn get(&self) -> Result<Value, Self::Error> {
        (**self).get()
    }

    fn subscribe(&self, listener: Listener) -> Result<Unsubscribe, Self::Error> {
        (**self).subscribe(listener)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::convert::Infallible;

    #[derive(Default)]
    struct Constant {
        listeners: Mutex<usize>,
    }

    impl SourceStore for Constant {
        type Error = Infallible;

        fn get(&self) -> Result<Value, Infallible> {
            Ok(Value::from("fixed"))
        }

        fn subscribe(&self, listener: Listener) -> Result<Unsubscribe, Infallible> {
            listener(&Value::from("fixed"));
            *self.listeners.lock() += 1;
            Ok(Box::new(|| {}))
        }
    }

    fn read<S: SourceStore>(store: S) -> Value {
        store.get().unwrap_or_default()
    }

    #[test]
    fn shared_and_borrowed_stores_delegate() {
        let store = Arc::new(Constant::default());

        assert_eq!(read(&*store), Value::from("fixed"));
        assert_eq!(read(store.clone()), Value::from("fixed"));

        let unsubscribe = store.subscribe(Box::new(|_| {})).unwrap();
        unsubscribe();
        assert_eq!(*store.listeners.lock(), 1);
    }
}
