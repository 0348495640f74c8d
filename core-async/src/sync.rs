//! Synchronization primitives.
//!
//! Tokio's async-aware primitives plus the cancellation token used for loop
//! shutdown. The bridge-specific channels live in [`crate::signal`],
//! [`crate::slot`] and [`crate::handoff`].

pub use tokio::sync::{broadcast, mpsc, oneshot, Notify};

pub use tokio_util::sync::CancellationToken;
