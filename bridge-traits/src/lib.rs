//! # Host Bridge Traits
//!
//! The contract between the bridge core and the host environment it is
//! embedded in (an Android application, a browser extension, a tray app).
//!
//! ## Overview
//!
//! The host talks to the core through callbacks on arbitrary threads; the core
//! talks back through a small set of synchronous queries. This crate defines
//! the vocabulary for both directions:
//!
//! - [`HostPlatform`](host::HostPlatform) - outbound query surface, one
//!   [`Selector`](host::Selector) per host capability
//! - [`HostHandle`](handle::HostHandle) - owned reference to a host object,
//!   released exactly once on drop
//! - [`Clock`](time::Clock) - injectable time source for expiry scheduling
//! - [`LoggerSink`](logging::LoggerSink) - mirror structured logs into the host
//!
//! ## Error Handling
//!
//! All host calls return [`BridgeError`](error::BridgeError):
//!
//! | Variant | Meaning | Retried? |
//! |---------|---------|----------|
//! | `HostUnavailable` | boundary call failed | no, surfaced to caller |
//! | `InvalidHandle` | null or stale handle, a caller bug | no |
//! | `HostRejected` | host-side refusal | no, surfaced as-is |
//! | `ParseFailure` | malformed host data | skipped and logged where possible |
//!
//! ## Thread Safety
//!
//! Every trait here requires `Send + Sync` through
//! [`PlatformSendSync`](platform::PlatformSendSync).

pub mod error;
pub mod handle;
pub mod host;
pub mod logging;
pub mod platform;
pub mod time;

pub use error::{BridgeError, Result};

pub use handle::{HandleReleaser, HostHandle, RawHandle};
pub use host::{HostPlatform, HostQuery, HostValue, Selector};
pub use logging::{LogEntry, LogLevel, LoggerSink};
pub use time::{Clock, ManualClock, SystemClock};
