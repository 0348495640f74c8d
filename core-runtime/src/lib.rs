//! # Core Runtime Module
//!
//! Runtime infrastructure shared by the bridge crates:
//! - Logging and tracing setup, with forwarding into a host log sink
//! - Bridge configuration with fail-fast capability checks
//! - Event bus used to surface lifecycle facts and handler failures to the UI
//!
//! ## Overview
//!
//! Nothing in here talks to the host directly. Configuration validates the
//! host adapter it is given; the event bus and logging layers are consumed by
//! `core-bridge` and by whatever UI layer subscribes to bridge events.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
