//! # Host Event Bridge
//!
//! Reconciles an asynchronous, callback-driven host environment (an Android
//! application, a browser extension, a tray app) with one coherent
//! application control loop.
//!
//! ## Overview
//!
//! ```text
//! host callbacks ──> signals / slots / handoffs ──> EventLoop ──> AppHandler
//!                                                      │
//!                    host <── PlatformQueries <────────┘
//! ```
//!
//! - [`bridge`]: [`HostBridge`] lifecycle (`create`, `run`, `shutdown`) and
//!   the [`BridgeInbound`] surface host code calls into
//! - [`multiplexer`]: the event loop and the [`AppHandler`] trait
//! - [`platform`]: typed synchronous queries into the host
//! - [`notifications`]: status notification text and expiry alert scheduling
//! - [`interfaces`]: parser for the host's interface listing
//! - [`signature`]: release-signing certificate check
//!
//! Handler failures are logged and published as
//! [`BridgeEvent::HandlerFailed`] on [`HostBridge::events`]; they never stop
//! the loop.

pub mod bridge;
pub mod error;
pub mod interfaces;
pub mod multiplexer;
pub mod notifications;
pub mod platform;
pub mod signature;

pub use bridge::{BridgeInbound, HostBridge};
pub use error::{BridgeError, Error, Result};
pub use interfaces::{Interface, InterfaceFlags};
pub use multiplexer::{AppHandler, BridgeContext, NullHandler, Preferences};
pub use notifications::{
    ConnectionState, ConnectionStatus, ExitStatus, ExpiryPlan, ExpiryTier, NotificationText,
};
pub use platform::{PlatformQueries, REQUEST_PREPARE_VPN, REQUEST_SIGNIN};

pub use core_runtime::config::BridgeConfig;
pub use core_runtime::events::{BridgeEvent, EventSeverity};
