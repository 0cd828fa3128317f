//! Tether Core
//!
//! This crate mirrors external stores into a fine-grained reactive graph.
//! It implements:
//!
//! - Shape classification of dynamic store values
//! - Reactive primitives (signals, memos, effects, owners)
//! - A structured reactive store updated by field-level reconciliation
//! - The store adapter tying a source store's subscription to a reactive
//!   accessor and to the lifetime of a reactive owner
//!
//! # Architecture
//!
//! - `value`: the dynamic `Value` type and its `Shape`
//! - `reactive`: core reactive primitives and dependency tracking
//! - `store`: reactive trees and reconciliation
//! - `source`: the `SourceStore` trait the adapter consumes
//! - `adapter`: `use_store` and `bind_store`
//!
//! # Example
//!
//! ```rust,ignore
//! use tether_core::{use_store, reactive::{Effect, Owner}};
//!
//! let owner = Owner::new();
//! owner.run(|| {
//!     // `cart` is any `SourceStore` holding `{"items": [...], "total": 0}`
//!     let cart = use_store(&cart)?;
//!
//!     // Re-runs only when `total` changes
//!     Effect::new(move || {
//!         println!("Total: {:?}", cart.get().get("total"));
//!     });
//!     Ok::<_, tether_core::Error>(())
//! })?;
//!
//! // Unsubscribes from the store and stops the effect
//! owner.dispose();
//! ```

pub mod adapter;
pub mod error;
pub mod reactive;
pub mod source;
pub mod store;
pub mod value;

pub use adapter::{
    bind_store, bind_store_with, use_store, use_store_with, StoreAccessor, Strategy,
    Subscription, UseStoreOptions,
};
pub use error::{Error, Result};
pub use source::{Listener, SourceStore, Unsubscribe};
pub use store::{ReactiveStore, ReconcileOptions, StoreNode, StoreValue};
pub use value::{is_primitive, Function, Shape, Value};
