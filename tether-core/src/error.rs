//! Error types for the adapter and its reactive host.

use thiserror::Error;

/// Boxed error produced by a source store.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors surfaced by `tether_core`.
#[derive(Debug, Error)]
pub enum Error {
    /// A scope-bound operation ran with no active owner.
    #[error("no reactive owner is active; wrap the call in `Owner::run`")]
    NoOwner,

    /// The active owner has already been disposed.
    #[error("reactive owner has already been disposed")]
    OwnerDisposed,

    /// The source store failed to produce its value or accept a listener.
    #[error("source store failed: {0}")]
    Source(#[source] BoxError),
}

impl Error {
    /// Wrap a store failure.
    pub fn from_source<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Source(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
