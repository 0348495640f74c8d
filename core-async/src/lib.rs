//! Async runtime facade and host-boundary channel primitives.
//!
//! Everything above this crate reaches the executor through these re-exports
//! instead of depending on Tokio directly. It also provides the three channel
//! shapes the bridge uses to turn host callbacks into loop events:
//!
//! | Primitive | Payload | On a second write before a read | Producer blocks? |
//! |-----------|---------|---------------------------------|------------------|
//! | [`SignalChannel`] | none | coalesced | never |
//! | [`Slot<T>`](slot::Slot) | latest value | overwritten | never |
//! | [`handoff`] | owned value | queued, FIFO | until received |
//!
//! # Examples
//!
//! ```rust
//! use core_async::{signal::SignalChannel, slot::Slot};
//!
//! async fn drain(revoked: SignalChannel, online: Slot<bool>) {
//!     tokio::select! {
//!         _ = revoked.wait() => println!("revoked"),
//!         up = online.recv() => println!("online: {up}"),
//!     }
//! }
//! ```

pub mod handoff;
pub mod runtime;
pub mod signal;
pub mod slot;
pub mod sync;
pub mod task;
pub mod time;

pub use handoff::{HandoffError, HandoffReceiver, HandoffSender};
pub use signal::SignalChannel;
pub use slot::Slot;
pub use task::spawn;
pub use time::{sleep, Duration, Instant};
