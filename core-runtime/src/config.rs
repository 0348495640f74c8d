//! # Bridge Configuration Module
//!
//! Configuration for a Host Event Bridge instance.
//!
//! ## Overview
//!
//! [`BridgeConfig`] is built with a builder and validated before the bridge
//! exists. The host adapter is the only required dependency; everything else
//! has a default. Validation is fail-fast: a host that does not implement a
//! required selector is rejected here with an actionable
//! [`Error::CapabilityMissing`] rather than failing later inside the event loop.
//!
//! ## Required Dependencies
//!
//! - `HostPlatform` - outbound query surface
//!
//! ## Optional Dependencies (with defaults)
//!
//! - `Clock` - time source for expiry scheduling (default: `SystemClock`)
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::BridgeConfig;
//! use std::sync::Arc;
//!
//! let config = BridgeConfig::builder()
//!     .host(Arc::new(AndroidHost::new(&mut env, &context, handles)?))
//!     .handoff_capacity(4)
//!     .build()?;
//! ```
//!
//! ## Error Handling
//!
//! ```should_panic
//! use core_runtime::config::BridgeConfig;
//!
//! // No host adapter: fails with an actionable error
//! let config = BridgeConfig::builder()
//!     .build()
//!     .expect("Should fail - missing host adapter");
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{Clock, HostPlatform, Selector, SystemClock};
use std::sync::Arc;
use std::time::Duration;

/// Fingerprint of the certificate release builds are signed with.
pub const DEFAULT_RELEASE_FINGERPRINT: &str =
    "86:9D:11:8B:63:1E:F8:35:C6:D9:C2:66:53:BC:28:22:2F:B8:C1:AE";

/// Remaining time below which the "expires soon" alert fires.
pub const DEFAULT_EXPIRY_SOON: Duration = Duration::from_secs(5 * 60);

/// Remaining time below which the "expires in a day" alert fires.
pub const DEFAULT_EXPIRY_WARNING: Duration = Duration::from_secs(24 * 60 * 60);

pub const DEFAULT_HANDOFF_CAPACITY: usize = 8;

/// Configuration for a Host Event Bridge.
///
/// Use [`BridgeConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct BridgeConfig {
    /// Outbound query surface (required)
    pub host: Arc<dyn HostPlatform>,

    /// Time source for expiry scheduling
    pub clock: Arc<dyn Clock>,

    /// Selectors the host must implement; checked at build time
    pub required_selectors: Vec<Selector>,

    /// Colon-separated SHA-1 fingerprint of the release signing certificate
    pub release_fingerprint: String,

    pub expiry_soon: Duration,

    pub expiry_warning: Duration,

    /// Queue depth between host callback threads and the loop
    pub handoff_capacity: usize,

    /// Per-subscriber buffer of the event bus
    pub event_buffer: usize,

    /// Publish handler failures on the event bus in addition to logging them
    pub surface_errors: bool,
}

impl std::fmt::Debug for BridgeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeConfig")
            .field("host", &"HostPlatform { ... }")
            .field("clock", &"Clock { ... }")
            .field("required_selectors", &self.required_selectors)
            .field("release_fingerprint", &self.release_fingerprint)
            .field("expiry_soon", &self.expiry_soon)
            .field("expiry_warning", &self.expiry_warning)
            .field("handoff_capacity", &self.handoff_capacity)
            .field("event_buffer", &self.event_buffer)
            .field("surface_errors", &self.surface_errors)
            .finish()
    }
}

impl BridgeConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> BridgeConfigBuilder {
        BridgeConfigBuilder::default()
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// - A required selector is not supported by the host
    /// - The expiry thresholds are zero or out of order
    /// - The handoff capacity or event buffer is zero
    /// - The release fingerprint is not a SHA-1 fingerprint
    pub fn validate(&self) -> Result<()> {
        let supported = self.host.supported_selectors();
        let missing: Vec<String> = self
            .required_selectors
            .iter()
            .filter(|selector| !supported.contains(selector))
            .map(|selector| selector.method_name().to_string())
            .collect();

        if !missing.is_empty() {
            return Err(Error::CapabilityMissing {
                capability: "HostPlatform".to_string(),
                message: format!(
                    "The host adapter does not implement: {}. \
                     Implement these selectors or drop them from required_selectors().",
                    missing.join(", ")
                ),
            });
        }

        if self.expiry_soon.is_zero() {
            return Err(Error::Config(
                "expiry_soon must be greater than zero".to_string(),
            ));
        }

        if self.expiry_soon >= self.expiry_warning {
            return Err(Error::Config(format!(
                "expiry_soon ({:?}) must be shorter than expiry_warning ({:?})",
                self.expiry_soon, self.expiry_warning
            )));
        }

        if self.handoff_capacity == 0 {
            return Err(Error::Config(
                "handoff_capacity must be greater than zero".to_string(),
            ));
        }

        if self.event_buffer == 0 {
            return Err(Error::Config(
                "event_buffer must be greater than zero".to_string(),
            ));
        }

        let digits: String = self
            .release_fingerprint
            .chars()
            .filter(|c| *c != ':')
            .collect();
        if digits.len() != 40 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::Config(format!(
                "release_fingerprint is not a SHA-1 fingerprint: {}",
                self.release_fingerprint
            )));
        }

        Ok(())
    }
}

/// Builder for [`BridgeConfig`].
#[derive(Default)]
pub struct BridgeConfigBuilder {
    host: Option<Arc<dyn HostPlatform>>,
    clock: Option<Arc<dyn Clock>>,
    required_selectors: Option<Vec<Selector>>,
    release_fingerprint: Option<String>,
    expiry_soon: Option<Duration>,
    expiry_warning: Option<Duration>,
    handoff_capacity: Option<usize>,
    event_buffer: Option<usize>,
    surface_errors: Option<bool>,
}

impl BridgeConfigBuilder {
    /// Sets the host adapter (required).
    pub fn host(mut self, host: Arc<dyn HostPlatform>) -> Self {
        self.host = Some(host);
        self
    }

    /// Sets the time source. Tests inject a `ManualClock` here.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Restricts the selectors the host must implement.
    ///
    /// Defaults to every selector. Hosts that never attach an activity, for
    /// example, can leave out `ShowUrl` and `PrepareVpnPermission`.
    pub fn required_selectors(mut self, selectors: impl IntoIterator<Item = Selector>) -> Self {
        self.required_selectors = Some(selectors.into_iter().collect());
        self
    }

    pub fn release_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.release_fingerprint = Some(fingerprint.into());
        self
    }

    pub fn expiry_soon(mut self, threshold: Duration) -> Self {
        self.expiry_soon = Some(threshold);
        self
    }

    pub fn expiry_warning(mut self, threshold: Duration) -> Self {
        self.expiry_warning = Some(threshold);
        self
    }

    pub fn handoff_capacity(mut self, capacity: usize) -> Self {
        self.handoff_capacity = Some(capacity);
        self
    }

    pub fn event_buffer(mut self, size: usize) -> Self {
        self.event_buffer = Some(size);
        self
    }

    pub fn surface_errors(mut self, enabled: bool) -> Self {
        self.surface_errors = Some(enabled);
        self
    }

    /// Builds and validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapabilityMissing`] if no host adapter was provided or
    /// the host lacks a required selector, and [`Error::Config`] for invalid
    /// values. See [`BridgeConfig::validate`].
    pub fn build(self) -> Result<BridgeConfig> {
        let host = self.host.ok_or_else(|| Error::CapabilityMissing {
            capability: "HostPlatform".to_string(),
            message: "No host adapter provided. \
                      Call .host() with a HostPlatform implementation \
                      (bridge-android's AndroidHost on Android)."
                .to_string(),
        })?;

        let config = BridgeConfig {
            host,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            required_selectors: self
                .required_selectors
                .unwrap_or_else(|| Selector::ALL.to_vec()),
            release_fingerprint: self
                .release_fingerprint
                .unwrap_or_else(|| DEFAULT_RELEASE_FINGERPRINT.to_string()),
            expiry_soon: self.expiry_soon.unwrap_or(DEFAULT_EXPIRY_SOON),
            expiry_warning: self.expiry_warning.unwrap_or(DEFAULT_EXPIRY_WARNING),
            handoff_capacity: self.handoff_capacity.unwrap_or(DEFAULT_HANDOFF_CAPACITY),
            event_buffer: self.event_buffer.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            surface_errors: self.surface_errors.unwrap_or(true),
        };

        config.validate()?;
        Ok(config)
    }
}
