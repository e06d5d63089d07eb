//! The subscribable projection.
//!
//! A [`StateView`] is a cursor over the client mirror carrying the path by
//! which it was reached. Descending yields another cursor; `subscribe`
//! registers a listener at the cursor's path. The projection is read-only by
//! construction.

use crate::client::ClientInner;
use crate::registry::Listener;
use crate::subscription::Subscription;
use serde_json::Value;
use std::sync::Arc;
use yuzu_state::{read_path_optional, Path};

/// Read-only cursor over the client's mirror.
///
/// Two cursors for the same path behave identically but are independent
/// values; hold on to whichever is convenient.
#[derive(Clone)]
pub struct StateView {
    inner: Arc<ClientInner>,
    path: Path,
}

impl StateView {
    pub(crate) fn new(inner: Arc<ClientInner>, path: Path) -> Self {
        Self { inner, path }
    }

    /// The path this cursor addresses.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Cursor for a keyed child.
    pub fn child(&self, key: impl Into<String>) -> StateView {
        StateView {
            inner: self.inner.clone(),
            path: self.path.with_segment(key),
        }
    }

    /// Cursor for an array element.
    pub fn index(&self, i: usize) -> StateView {
        self.child(i.to_string())
    }

    /// Clone the value at this cursor, if present.
    pub fn value(&self) -> Option<Value> {
        let doc = self.inner.mirror.get();
        read_path_optional(&doc, &self.path).map(|v| v.into_value())
    }

    /// Whether a value exists at this cursor.
    pub fn exists(&self) -> bool {
        self.value().is_some()
    }

    /// Register a listener at this cursor's path.
    ///
    /// It fires for every patch whose path this one prefixes, and on every
    /// `complete` reload.
    pub fn subscribe(
        &self,
        listener: impl Fn(Option<&Value>, &Path) + Send + Sync + 'static,
    ) -> Subscription {
        let listener: Listener = Arc::new(listener);
        self.inner.registry.add(self.path.clone(), listener)
    }
}

impl std::fmt::Debug for StateView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateView").field("path", &self.path).finish()
    }
}
