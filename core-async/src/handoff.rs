//! Ownership-transferring rendezvous channel.
//!
//! Unlike [`Slot`](crate::slot::Slot), nothing here is ever coalesced: every
//! value sent is received exactly once, in FIFO order. A send only returns
//! after the receiver has taken the value, which is what host callbacks need
//! when they pass a resource (a service reference) whose release must be
//! tracked individually.
//!
//! If the receiver never receives, a sender stays blocked. That is the
//! contract, so keep the receiving loop running for as long as senders exist.
//!
//! # Examples
//!
//! ```rust
//! use core_async::handoff;
//!
//! # async fn example() {
//! let (tx, mut rx) = handoff::channel::<u64>(4);
//!
//! let host = std::thread::spawn(move || tx.send_blocking(7));
//! assert_eq!(rx.recv().await, Some(7));
//! host.join().unwrap().unwrap();
//! # }
//! ```

use std::fmt;

use tokio::sync::{mpsc, oneshot};

struct Parcel<T> {
    value: T,
    accepted: oneshot::Sender<()>,
}

/// Why a handoff did not complete.
pub enum HandoffError<T> {
    /// The receiver was gone before the value was queued; the value is returned.
    Closed(T),
    /// The receiver shut down after the value was queued but before taking it.
    /// The value was dropped on the receiving side.
    Dropped,
}

impl<T> HandoffError<T> {
    /// Recover the value if it never left the sender.
    pub fn into_inner(self) -> Option<T> {
        match self {
            HandoffError::Closed(value) => Some(value),
            HandoffError::Dropped => None,
        }
    }
}

impl<T> fmt::Debug for HandoffError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandoffError::Closed(_) => f.write_str("Closed(..)"),
            HandoffError::Dropped => f.write_str("Dropped"),
        }
    }
}

impl<T> fmt::Display for HandoffError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandoffError::Closed(_) => f.write_str("handoff receiver is closed"),
            HandoffError::Dropped => f.write_str("handoff receiver dropped the value unaccepted"),
        }
    }
}

impl<T> std::error::Error for HandoffError<T> {}

/// Create a handoff channel.
///
/// `capacity` bounds how many senders can be queued at once; it does not
/// change the rendezvous semantics of each send.
///
/// # Panics
///
/// Panics if `capacity` is zero.
pub fn channel<T>(capacity: usize) -> (HandoffSender<T>, HandoffReceiver<T>) {
    let (tx, rx) = mpsc::channel(capacity);
    (HandoffSender { tx }, HandoffReceiver { rx })
}

/// Sending half. Clonable; one per host callback site.
pub struct HandoffSender<T> {
    tx: mpsc::Sender<Parcel<T>>,
}

impl<T> HandoffSender<T> {
    /// Send from a plain (non-async) thread, blocking until the value is accepted.
    ///
    /// # Panics
    ///
    /// Panics if called from within an asynchronous execution context; use
    /// [`send`](Self::send) there.
    pub fn send_blocking(&self, value: T) -> Result<(), HandoffError<T>> {
        let (accepted, ack) = oneshot::channel();
        self.tx
            .blocking_send(Parcel { value, accepted })
            .map_err(|mpsc::error::SendError(parcel)| HandoffError::Closed(parcel.value))?;
        ack.blocking_recv().map_err(|_| HandoffError::Dropped)
    }

    /// Send from async code, completing once the value is accepted.
    pub async fn send(&self, value: T) -> Result<(), HandoffError<T>> {
        let (accepted, ack) = oneshot::channel();
        self.tx
            .send(Parcel { value, accepted })
            .await
            .map_err(|mpsc::error::SendError(parcel)| HandoffError::Closed(parcel.value))?;
        ack.await.map_err(|_| HandoffError::Dropped)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl<T> Clone for HandoffSender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T> fmt::Debug for HandoffSender<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandoffSender")
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Receiving half. Exactly one per channel.
pub struct HandoffReceiver<T> {
    rx: mpsc::Receiver<Parcel<T>>,
}

impl<T> HandoffReceiver<T> {
    /// Accept the next value, unblocking its sender.
    ///
    /// Returns `None` once every sender is gone. Cancel-safe.
    pub async fn recv(&mut self) -> Option<T> {
        let Parcel { value, accepted } = self.rx.recv().await?;
        // The sender may have given up waiting; ownership still moved here.
        let _ = accepted.send(());
        Some(value)
    }

    /// Refuse further sends. Already queued values can still be received.
    pub fn close(&mut self) {
        self.rx.close();
    }
}

impl<T> fmt::Debug for HandoffReceiver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandoffReceiver").finish_non_exhaustive()
    }
}
