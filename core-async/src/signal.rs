//! Zero-payload, coalescing notification channel.
//!
//! A [`SignalChannel`] holds at most one pending signal. Any number of
//! `notify()` calls issued before the consumer waits collapse into a single
//! wakeup, so a burst of host callbacks costs the loop one iteration.
//!
//! # Examples
//!
//! ```rust
//! use core_async::signal::SignalChannel;
//!
//! # async fn example() {
//! let prepared = SignalChannel::new();
//! let host_side = prepared.clone();
//!
//! host_side.notify();
//! host_side.notify();
//!
//! prepared.wait().await;          // consumes the single pending signal
//! assert!(!prepared.try_take());  // nothing left
//! # }
//! ```

use std::fmt;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::Notify;

/// Single-slot signal. Clones share the same slot.
#[derive(Clone, Default)]
pub struct SignalChannel {
    inner: Arc<Notify>,
}

impl SignalChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a signal pending.
    ///
    /// Never blocks and never fails; a no-op if a signal is already pending.
    /// Safe to call from any thread, including non-runtime host threads.
    pub fn notify(&self) {
        self.inner.notify_one();
    }

    /// Wait until a signal is pending, then consume it.
    ///
    /// Intended for a single consumer. Cancel-safe: dropping the future before
    /// it completes leaves a pending signal in place.
    pub async fn wait(&self) {
        self.inner.notified().await;
    }

    /// Consume a pending signal without waiting. Returns whether one was pending.
    pub fn try_take(&self) -> bool {
        self.inner.notified().now_or_never().is_some()
    }
}

impl fmt::Debug for SignalChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalChannel").finish_non_exhaustive()
    }
}
