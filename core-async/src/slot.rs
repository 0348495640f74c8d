//! Single-slot, last-write-wins value channel.
//!
//! A [`Slot`] buffers at most one value. Writing while a value is still
//! unconsumed replaces it; the displaced value is handed back to the writer so
//! it is dropped (and any resources it owns released) on the producer side.
//! Producers never block and never see backpressure; the consumer only ever
//! observes the newest value.
//!
//! # Examples
//!
//! ```rust
//! use core_async::slot::Slot;
//!
//! # async fn example() {
//! let connectivity = Slot::new();
//! connectivity.put(false);
//! let displaced = connectivity.put(true);
//!
//! assert_eq!(displaced, Some(false));
//! assert_eq!(connectivity.recv().await, true);
//! # }
//! ```

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::Notify;

struct SlotInner<T> {
    value: Mutex<Option<T>>,
    notify: Notify,
}

/// Latest-value slot. Clones share the same slot.
pub struct Slot<T> {
    inner: Arc<SlotInner<T>>,
}

impl<T> Slot<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SlotInner {
                value: Mutex::new(None),
                notify: Notify::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<T>> {
        // The guarded section never panics, but do not let a poisoned lock
        // wedge a host callback thread.
        self.inner
            .value
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Store `value`, returning the unconsumed value it replaced, if any.
    pub fn put(&self, value: T) -> Option<T> {
        let displaced = self.lock().replace(value);
        self.inner.notify.notify_one();
        displaced
    }

    /// Take the pending value without waiting.
    pub fn take(&self) -> Option<T> {
        self.lock().take()
    }

    pub fn is_pending(&self) -> bool {
        self.lock().is_some()
    }

    /// Wait for a value and take it.
    ///
    /// Intended for a single consumer. Cancel-safe: the value is only removed
    /// in the same poll that returns it.
    pub async fn recv(&self) -> T {
        loop {
            if let Some(value) = self.take() {
                return value;
            }
            self.inner.notify.notified().await;
        }
    }
}

impl<T> Clone for Slot<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Slot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slot")
            .field("pending", &self.is_pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_last_write_wins() {
        let slot = Slot::new();
        assert_eq!(slot.put("first"), None);
        assert_eq!(slot.put("second"), Some("first"));

        assert_eq!(slot.recv().await, "second");
        assert!(!slot.is_pending());
    }

    #[tokio::test]
    async fn test_recv_waits_for_put_from_host_thread() {
        let slot = Slot::new();
        let producer = slot.clone();

        let thread = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(10));
            producer.put(42u32);
        });

        let value = tokio::time::timeout(Duration::from_secs(5), slot.recv())
            .await
            .expect("value should arrive");
        assert_eq!(value, 42);
        thread.join().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_consumed_value_is_not_redelivered() {
        let slot = Slot::new();
        slot.put(1u8);
        slot.put(2u8);
        assert_eq!(slot.recv().await, 2);

        let again = tokio::time::timeout(Duration::from_secs(1), slot.recv()).await;
        assert!(again.is_err());
    }

    #[test]
    fn test_displaced_value_is_dropped_by_writer() {
        let first = Arc::new(());
        let slot = Slot::new();
        slot.put(Arc::clone(&first));

        let displaced = slot.put(Arc::new(()));
        assert_eq!(Arc::strong_count(&first), 2);
        drop(displaced);
        assert_eq!(Arc::strong_count(&first), 1);
    }
}
