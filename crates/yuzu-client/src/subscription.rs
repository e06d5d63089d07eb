//! Subscription handles.
//!
//! A handle owns a list of teardown closures behind a `closed` flag. Handles
//! compose: adding handle B to handle A transfers B's teardown under A, so
//! unsubscribing A tears B down too. Adding anything to an already-closed
//! handle runs its teardown immediately.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

type Teardown = Box<dyn FnOnce() + Send>;

/// Handle to an active subscription.
///
/// `unsubscribe` is idempotent: the first call runs every registered teardown
/// exactly once, later calls do nothing.
///
/// # Examples
///
/// ```
/// use yuzu_client::Subscription;
/// use std::sync::{Arc, Mutex};
///
/// let log = Arc::new(Mutex::new(Vec::new()));
///
/// let l = log.clone();
/// let outer = Subscription::new(move || l.lock().unwrap().push("outer"));
/// let l = log.clone();
/// outer.add(Subscription::new(move || l.lock().unwrap().push("inner")));
///
/// outer.unsubscribe();
/// outer.unsubscribe(); // no effect
///
/// assert_eq!(*log.lock().unwrap(), vec!["outer", "inner"]);
/// ```
#[derive(Clone)]
pub struct Subscription {
    inner: Arc<SubscriptionInner>,
}

struct SubscriptionInner {
    closed: AtomicBool,
    teardowns: Mutex<Vec<Teardown>>,
}

impl Subscription {
    /// Create a handle with one teardown.
    pub fn new(teardown: impl FnOnce() + Send + 'static) -> Self {
        let sub = Self::empty();
        sub.push_teardown(Box::new(teardown));
        sub
    }

    /// Create a handle with no teardowns.
    pub fn empty() -> Self {
        Self {
            inner: Arc::new(SubscriptionInner {
                closed: AtomicBool::new(false),
                teardowns: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Whether this handle has been unsubscribed.
    pub fn closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Run all teardowns. Idempotent.
    pub fn unsubscribe(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let teardowns = std::mem::take(&mut *self.inner.teardowns.lock().unwrap());
        for teardown in teardowns {
            teardown();
        }
    }

    /// Transfer another handle under this one: unsubscribing this handle
    /// unsubscribes `other` too.
    ///
    /// If this handle is already closed, `other` is unsubscribed immediately.
    pub fn add(&self, other: Subscription) {
        self.push_teardown(Box::new(move || other.unsubscribe()));
    }

    /// Register a plain teardown closure under this handle.
    ///
    /// If this handle is already closed the closure runs immediately.
    pub fn add_teardown(&self, teardown: impl FnOnce() + Send + 'static) {
        self.push_teardown(Box::new(teardown));
    }

    fn push_teardown(&self, teardown: Teardown) {
        if self.closed() {
            teardown();
            return;
        }
        let mut teardowns = self.inner.teardowns.lock().unwrap();
        // Re-check under the lock: unsubscribe may have raced in between.
        if self.closed() {
            drop(teardowns);
            teardown();
        } else {
            teardowns.push(teardown);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("closed", &self.closed())
            .finish()
    }
}
