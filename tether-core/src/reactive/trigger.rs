//! A reactive source that carries no value.
//!
//! Store nodes keep one trigger per field and one for their key set, so a
//! reader depends on exactly the parts of the tree it looked at.

use std::fmt;
use std::sync::Arc;

use super::runtime::Runtime;
use super::SourceId;

struct TriggerInner {
    id: SourceId,
}

impl Drop for TriggerInner {
    fn drop(&mut self) {
        Runtime::release_source(self.id);
    }
}

#[derive(Clone)]
pub struct Trigger {
    inner: Arc<TriggerInner>,
}

impl Trigger {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(TriggerInner { id: SourceId::new() }),
        }
    }

    pub fn id(&self) -> SourceId {
        self.inner.id
    }

    /// Register the current computation as a dependent.
    pub fn track(&self) {
        Runtime::track(self.inner.id);
    }

    /// Notify every dependent.
    pub fn notify(&self) {
        Runtime::notify_source_change(self.inner.id);
    }

    pub fn subscriber_count(&self) -> usize {
        Runtime::subscriber_count(self.inner.id)
    }
}

impl Default for Trigger {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Trigger").field(&self.inner.id).finish()
    }
}
