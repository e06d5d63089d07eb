//! Shared mutable document cell.
//!
//! `DocCell` wraps a `Mutex<Value>` so that tracker writes immediately update
//! the document and subsequent reads see the latest values.

use serde_json::Value;
use std::sync::{Mutex, MutexGuard};

/// Shared mutable JSON document.
///
/// All reads lock briefly to fetch the current value. Callers should clone
/// any needed data before dropping the guard.
pub struct DocCell(Mutex<Value>);

impl DocCell {
    /// Create a new `DocCell` with the given initial value.
    pub fn new(value: Value) -> Self {
        Self(Mutex::new(value))
    }

    /// Acquire a lock on the document.
    #[inline]
    pub fn get(&self) -> MutexGuard<'_, Value> {
        self.0.lock().unwrap()
    }

    /// Replace the entire document.
    pub fn replace(&self, value: Value) {
        *self.get() = value;
    }

    /// Clone the current document value.
    pub fn snapshot(&self) -> Value {
        self.get().clone()
    }

    /// Consume the cell and return the inner value.
    pub fn into_inner(self) -> Value {
        self.0.into_inner().unwrap()
    }
}

impl Default for DocCell {
    fn default() -> Self {
        Self::new(Value::Object(Default::default()))
    }
}

impl Clone for DocCell {
    fn clone(&self) -> Self {
        Self::new(self.snapshot())
    }
}

impl std::fmt::Debug for DocCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("DocCell").field(&"<Value>").finish()
    }
}
