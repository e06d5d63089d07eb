//! Listener storage and notification fan-out.
//!
//! Listeners are kept in insertion order. A listener at path L is triggered
//! by a patch at path P iff L is a prefix of P (the empty path matches
//! everything). Batch notification invokes each matched listener at most
//! once, reporting the listener's own path as the trigger. A listener whose
//! path no longer resolves is silently skipped — unless its exact path is the
//! one the patch removed, in which case it fires with the absent value.
//!
//! Listener panics are caught and swallowed; remaining listeners still run.

use crate::subscription::Subscription;
use serde_json::Value;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use yuzu_state::{read_path_optional, Path};

/// A subscribed callback: `(value at the listener's path, triggering path)`.
///
/// The value is `None` when the entry at the listener's path was removed by
/// the very patch being delivered.
pub type Listener = Arc<dyn Fn(Option<&Value>, &Path) + Send + Sync>;

struct ListenerRecord {
    id: u64,
    path: Path,
    listener: Listener,
}

#[derive(Default)]
pub(crate) struct SubscriptionRegistry {
    records: Mutex<Vec<ListenerRecord>>,
    next_id: AtomicU64,
}

impl SubscriptionRegistry {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register a listener; the returned handle's teardown removes exactly
    /// this record.
    pub(crate) fn add(self: &Arc<Self>, path: Path, listener: Listener) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.records.lock().unwrap().push(ListenerRecord {
            id,
            path,
            listener,
        });

        let registry: Weak<Self> = Arc::downgrade(self);
        Subscription::new(move || {
            if let Some(registry) = registry.upgrade() {
                registry.remove(id);
            }
        })
    }

    fn remove(&self, id: u64) {
        self.records.lock().unwrap().retain(|r| r.id != id);
    }

    pub(crate) fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    /// Notify listeners matched by a single patch at `triggered`.
    pub(crate) fn notify_single(&self, doc: &Value, triggered: &Path) {
        let matched = self.collect(|record| record.path.is_prefix_of(triggered));
        for (id, path, listener) in matched {
            let value = read_path_optional(doc, &path).map(|v| v.into_value());
            match value {
                Some(v) => self.invoke(id, &listener, Some(&v), triggered),
                None if path == *triggered => self.invoke(id, &listener, None, triggered),
                None => {}
            }
        }
    }

    /// Notify listeners matched by any path in a batch, each at most once.
    ///
    /// The triggering path reported is the listener's own path: one
    /// invocation cannot faithfully attribute one of several triggers.
    pub(crate) fn notify_batch(&self, doc: &Value, triggered: &[Path]) {
        let matched =
            self.collect(|record| triggered.iter().any(|p| record.path.is_prefix_of(p)));
        for (id, path, listener) in matched {
            let value = read_path_optional(doc, &path).map(|v| v.into_value());
            match value {
                Some(v) => self.invoke(id, &listener, Some(&v), &path),
                None if triggered.contains(&path) => self.invoke(id, &listener, None, &path),
                None => {}
            }
        }
    }

    /// Notify every listener, reporting the root as the trigger. Used on
    /// `complete` reload.
    pub(crate) fn notify_all(&self, doc: &Value) {
        let root = Path::root();
        let matched = self.collect(|_| true);
        for (id, path, listener) in matched {
            if let Some(v) = read_path_optional(doc, &path) {
                let v = v.into_value();
                self.invoke(id, &listener, Some(&v), &root);
            }
        }
    }

    fn collect(&self, matches: impl Fn(&ListenerRecord) -> bool) -> Vec<(u64, Path, Listener)> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| matches(r))
            .map(|r| (r.id, r.path.clone(), r.listener.clone()))
            .collect()
    }

    fn invoke(&self, id: u64, listener: &Listener, value: Option<&Value>, triggered: &Path) {
        // A listener unsubscribed mid-notification must not fire.
        if !self.records.lock().unwrap().iter().any(|r| r.id == id) {
            return;
        }
        let _ = catch_unwind(AssertUnwindSafe(|| listener(value, triggered)));
    }
}
