//! Reactive Primitives
//!
//! This module implements the host reactive system the store adapter plugs
//! into: signals, triggers, memos, effects and owners.
//!
//! # Concepts
//!
//! ## Signals
//!
//! A Signal is a container for mutable state. When a signal's value is read
//! within a tracking context (such as a memo or effect), the signal
//! registers that context as a dependent. When the signal's value changes,
//! all dependents are notified.
//!
//! ## Triggers
//!
//! A Trigger is a signal without a value. Structured stores use one per
//! field so that readers depend on individual fields.
//!
//! ## Memos
//!
//! A Memo is a derived value that caches its result. It re-evaluates only
//! when one of its dependencies changes, and only notifies its own
//! dependents when the result is different.
//!
//! ## Effects
//!
//! An Effect is a side-effecting computation that runs whenever its
//! dependencies change.
//!
//! ## Owners
//!
//! An Owner is a scope holding teardown work. Disposing it runs registered
//! cleanups and stops the effects created inside it.
//!
//! # Implementation Notes
//!
//! Dependency tracking is automatic: a thread-local context records which
//! computation is running, and every read registers an edge with the
//! [`Runtime`].

mod context;
mod effect;
mod memo;
mod owner;
mod runtime;
mod signal;
mod subscriber;
mod trigger;

pub use context::ReactiveContext;
pub use effect::Effect;
pub use memo::{Memo, MemoState};
pub use owner::{on_cleanup, Owner};
pub use runtime::{Reactive, ReactiveHandle, Runtime};
pub use signal::{ReadSignal, Signal};
pub use subscriber::{SourceId, SubscriberId};
pub use trigger::Trigger;
