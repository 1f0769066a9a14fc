//! # One-to-many transition wakeup.
//!
//! [`Broadcaster`] wakes every task currently waiting on it; tasks that
//! begin waiting after a broadcast do not observe it. It signals
//! transitions, not state: no value is transferred, and woken tasks
//! recheck whatever shared state they care about.
//!
//! The generation counter closes the classic lost-wakeup race. Callers
//! sample [`epoch`](Broadcaster::epoch) *before* reading the state they
//! wait on; [`wait`](Broadcaster::wait) then returns immediately if any
//! broadcast has happened since that sample.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Notify;

/// Broadcast wakeup with generation-counter semantics.
#[derive(Debug, Default)]
pub(crate) struct Broadcaster {
    seq: AtomicU64,
    notify: Notify,
}

impl Broadcaster {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Samples the current generation. Pass the sampled value to
    /// [`wait`](Broadcaster::wait) after inspecting shared state.
    pub(crate) fn epoch(&self) -> u64 {
        self.seq.load(Ordering::SeqCst)
    }

    /// Wakes all tasks currently waiting and advances the generation.
    pub(crate) fn broadcast(&self) {
        self.seq.fetch_add(1, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    /// Blocks until the generation differs from `seen`.
    ///
    /// Returns immediately when a broadcast already happened after
    /// `seen` was sampled, so checking state between `epoch` and `wait`
    /// cannot miss a wakeup.
    pub(crate) async fn wait(&self, seen: u64) {
        while self.seq.load(Ordering::SeqCst) == seen {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register as a waiter before the final generation check,
            // so a broadcast in between still wakes us.
            notified.as_mut().enable();
            if self.seq.load(Ordering::SeqCst) != seen {
                return;
            }
            notified.await;
        }
    }
}
