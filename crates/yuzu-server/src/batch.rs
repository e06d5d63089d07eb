//! Patch coalescing.
//!
//! With a zero delay every patch goes out immediately as a `patch` message.
//! With a positive delay, the first patch into an empty buffer arms a single
//! one-shot timer; patches arriving while it is pending append to the same
//! buffer without resetting it. When the timer fires the buffer drains, in
//! insertion order, into one `patch-batch` message. Patches still buffered
//! when the server goes away are dropped — clients recover through the next
//! `complete` handshake.

use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use yuzu_protocol::ServerMessage;
use yuzu_state::Patch;

/// Receives each outbound message as soon as the batcher releases it.
pub(crate) type FlushSink = Arc<dyn Fn(ServerMessage) + Send + Sync>;

pub(crate) struct PatchBatcher {
    delay: Duration,
    buffer: Arc<Mutex<Vec<Patch>>>,
    out: FlushSink,
}

impl PatchBatcher {
    pub(crate) fn new(delay: Duration, out: FlushSink) -> Self {
        Self {
            delay,
            buffer: Arc::new(Mutex::new(Vec::new())),
            out,
        }
    }

    /// Accept one patch from the tracker, in write order.
    ///
    /// Must run inside a tokio runtime when the delay is positive.
    pub(crate) fn submit(&self, patch: Patch) {
        if self.delay.is_zero() {
            (self.out)(ServerMessage::Patch { patch });
            return;
        }

        let arm_timer = {
            let mut buffer = self.buffer.lock().unwrap();
            let was_empty = buffer.is_empty();
            buffer.push(patch);
            was_empty
        };

        if arm_timer {
            let buffer = Arc::downgrade(&self.buffer);
            let out = self.out.clone();
            let delay = self.delay;
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                flush(&buffer, &out);
            });
        }
    }
}

fn flush(buffer: &Weak<Mutex<Vec<Patch>>>, out: &FlushSink) {
    let Some(buffer) = buffer.upgrade() else {
        return;
    };
    let patches = std::mem::take(&mut *buffer.lock().unwrap());
    if !patches.is_empty() {
        out(ServerMessage::PatchBatch { patches });
    }
}
