//! Platform Query Facade.
//!
//! Typed, synchronous accessors over [`HostPlatform`]. Every method is one
//! round trip into the host and blocks for its duration, so call it from the
//! event loop or a blocking context and never while holding a lock. Errors
//! from the host are returned unmodified.
//!
//! Selectors are checked against the set the host advertised when the bridge
//! was built; querying anything else fails with
//! [`BridgeError::UnknownSelector`] without touching the host.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use bridge_traits::{BridgeError, HostHandle, HostPlatform, HostQuery, HostValue, Result, Selector};
use bytes::Bytes;
use core_runtime::config::BridgeConfig;
use tracing::debug;

use crate::interfaces::{parse_interfaces, Interface};
use crate::signature;

/// Activity request code for the sign-in flow.
pub const REQUEST_SIGNIN: i32 = 1000;
/// Activity request code for the VPN permission dialog.
pub const REQUEST_PREPARE_VPN: i32 = 1001;

/// Query facade shared by the event loop and application handlers.
#[derive(Clone)]
pub struct PlatformQueries {
    host: Arc<dyn HostPlatform>,
    supported: Arc<HashSet<Selector>>,
    release_fingerprint: Arc<str>,
}

impl PlatformQueries {
    pub fn new(host: Arc<dyn HostPlatform>, release_fingerprint: impl Into<Arc<str>>) -> Self {
        let supported = host.supported_selectors().into_iter().collect();
        Self {
            host,
            supported: Arc::new(supported),
            release_fingerprint: release_fingerprint.into(),
        }
    }

    pub fn from_config(config: &BridgeConfig) -> Self {
        Self::new(Arc::clone(&config.host), config.release_fingerprint.as_str())
    }

    pub fn supports(&self, selector: Selector) -> bool {
        self.supported.contains(&selector)
    }

    /// Perform a raw query.
    ///
    /// # Errors
    ///
    /// [`BridgeError::UnknownSelector`] if the host did not advertise the
    /// selector, otherwise whatever the host returns.
    pub fn query(&self, query: HostQuery) -> Result<HostValue> {
        let selector = query.selector();
        if !self.supports(selector) {
            return Err(BridgeError::UnknownSelector(selector));
        }
        debug!(selector = %selector, "Host query");
        self.host.call(query)
    }

    fn text(&self, query: HostQuery) -> Result<String> {
        let selector = query.selector();
        self.query(query)?.into_text(selector)
    }

    fn flag(&self, query: HostQuery) -> Result<bool> {
        let selector = query.selector();
        self.query(query)?.into_bool(selector)
    }

    fn unit(&self, query: HostQuery) -> Result<()> {
        let selector = query.selector();
        self.query(query)?.into_unit(selector)
    }

    pub fn hostname(&self) -> Result<String> {
        self.text(HostQuery::Hostname)
    }

    pub fn os_version(&self) -> Result<String> {
        self.text(HostQuery::OsVersion)
    }

    pub fn model_name(&self) -> Result<String> {
        self.text(HostQuery::ModelName)
    }

    pub fn is_tv(&self) -> Result<bool> {
        self.flag(HostQuery::IsTv)
    }

    pub fn is_chrome_os(&self) -> Result<bool> {
        self.flag(HostQuery::IsChromeOs)
    }

    /// Raw bytes of the package signing certificate.
    pub fn package_certificate(&self) -> Result<Bytes> {
        self.query(HostQuery::PackageCertificate)?
            .into_bytes(Selector::PackageCertificate)
    }

    /// Whether the running package is signed with the release certificate.
    pub fn is_release_signed(&self) -> Result<bool> {
        let certificate = self.package_certificate()?;
        Ok(signature::matches_fingerprint(
            &certificate,
            &self.release_fingerprint,
        ))
    }

    /// The raw interface listing, one interface per line.
    pub fn interfaces_as_string(&self) -> Result<String> {
        self.text(HostQuery::InterfacesAsString)
    }

    /// Host network interfaces. Malformed lines are skipped, never fatal.
    pub fn list_interfaces(&self) -> Result<Vec<Interface>> {
        Ok(parse_interfaces(&self.interfaces_as_string()?))
    }

    /// Replace the persistent notification of a foreground service.
    pub fn update_status_notification(
        &self,
        service: &HostHandle,
        title: &str,
        message: &str,
    ) -> Result<()> {
        self.unit(HostQuery::UpdateStatusNotification {
            service: service.raw(),
            title: title.to_string(),
            message: message.to_string(),
        })
    }

    /// Post a user-visible alert through a service.
    pub fn push_notify(&self, service: &HostHandle, title: &str, message: &str) -> Result<()> {
        self.unit(HostQuery::PushNotify {
            service: service.raw(),
            title: title.to_string(),
            message: message.to_string(),
        })
    }

    /// Notify about a received file, opening `uri` when tapped.
    pub fn notify_file(&self, uri: &str, message: &str) -> Result<()> {
        self.unit(HostQuery::NotifyFile {
            uri: uri.to_string(),
            message: message.to_string(),
        })
    }

    /// Reflect the desired running state on the quick-settings tile.
    pub fn set_tile_status(&self, enabled: bool) -> Result<()> {
        self.unit(HostQuery::SetTileStatus { enabled })
    }

    /// Ask the host to show the VPN permission dialog from `activity`.
    ///
    /// The outcome arrives later as a prepared or closed signal.
    pub fn prepare_vpn_permission(&self, activity: &HostHandle) -> Result<()> {
        self.unit(HostQuery::PrepareVpnPermission {
            activity: activity.raw(),
            request_code: REQUEST_PREPARE_VPN,
        })
    }

    pub fn attach_peer(&self, activity: &HostHandle) -> Result<()> {
        self.unit(HostQuery::AttachPeer {
            activity: activity.raw(),
        })
    }

    pub fn show_url(&self, activity: &HostHandle, url: &str) -> Result<()> {
        self.unit(HostQuery::ShowUrl {
            activity: activity.raw(),
            url: url.to_string(),
        })
    }

    /// Open a content URI through the host and return the detached descriptor.
    ///
    /// # Errors
    ///
    /// [`BridgeError::HostRejected`] if the host answers with a negative
    /// descriptor.
    pub fn open_file_descriptor(&self, uri: &str, mode: &str) -> Result<i32> {
        let fd = self
            .query(HostQuery::OpenFile {
                uri: uri.to_string(),
                mode: mode.to_string(),
            })?
            .into_fd(Selector::OpenFile)?;

        if fd < 0 {
            return Err(BridgeError::HostRejected(format!(
                "openUri returned invalid descriptor {fd}"
            )));
        }
        Ok(fd)
    }

    /// Open a content URI as a [`File`](std::fs::File).
    #[cfg(unix)]
    pub fn open_file(&self, uri: &str, mode: &str) -> Result<std::fs::File> {
        use std::os::fd::FromRawFd;

        let fd = self.open_file_descriptor(uri, mode)?;
        // SAFETY: the host detached the descriptor and handed its ownership to us.
        Ok(unsafe { std::fs::File::from_raw_fd(fd) })
    }
}

impl fmt::Debug for PlatformQueries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlatformQueries")
            .field("supported", &self.supported.len())
            .finish_non_exhaustive()
    }
}
