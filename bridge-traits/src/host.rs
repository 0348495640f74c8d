//! Outbound query surface (bridge → host).
//!
//! Every call into the host is a [`HostQuery`]: a selector naming one host
//! capability plus its arguments. The host answers with a [`HostValue`] whose
//! shape is fixed per selector. Hosts advertise which selectors they implement
//! through [`HostPlatform::supported_selectors`], which lets configuration fail
//! fast instead of discovering a missing capability in the middle of the loop.

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::{
    error::{BridgeError, Result},
    handle::RawHandle,
    platform::PlatformSendSync,
};

/// Name of a host capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Selector {
    Hostname,
    OsVersion,
    ModelName,
    IsTv,
    IsChromeOs,
    PackageCertificate,
    InterfacesAsString,
    UpdateStatusNotification,
    PushNotify,
    NotifyFile,
    SetTileStatus,
    PrepareVpnPermission,
    AttachPeer,
    ShowUrl,
    OpenFile,
}

impl Selector {
    /// Every selector the bridge knows about.
    pub const ALL: [Selector; 15] = [
        Selector::Hostname,
        Selector::OsVersion,
        Selector::ModelName,
        Selector::IsTv,
        Selector::IsChromeOs,
        Selector::PackageCertificate,
        Selector::InterfacesAsString,
        Selector::UpdateStatusNotification,
        Selector::PushNotify,
        Selector::NotifyFile,
        Selector::SetTileStatus,
        Selector::PrepareVpnPermission,
        Selector::AttachPeer,
        Selector::ShowUrl,
        Selector::OpenFile,
    ];

    /// Host-side method name, as exposed by the platform application class.
    pub fn method_name(self) -> &'static str {
        match self {
            Selector::Hostname => "getHostname",
            Selector::OsVersion => "getOSVersion",
            Selector::ModelName => "getModelName",
            Selector::IsTv => "isTV",
            Selector::IsChromeOs => "isChromeOS",
            Selector::PackageCertificate => "getPackageCertificate",
            Selector::InterfacesAsString => "getInterfacesAsString",
            Selector::UpdateStatusNotification => "updateStatusNotification",
            Selector::PushNotify => "notify",
            Selector::NotifyFile => "notifyFile",
            Selector::SetTileStatus => "setTileStatus",
            Selector::PrepareVpnPermission => "prepareVPN",
            Selector::AttachPeer => "attachPeer",
            Selector::ShowUrl => "showURL",
            Selector::OpenFile => "openUri",
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.method_name())
    }
}

/// A single request to the host, with its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostQuery {
    Hostname,
    OsVersion,
    ModelName,
    IsTv,
    IsChromeOs,
    PackageCertificate,
    InterfacesAsString,
    /// Update the persistent foreground notification of a service.
    UpdateStatusNotification {
        service: RawHandle,
        title: String,
        message: String,
    },
    /// Post a user-visible alert through a service.
    PushNotify {
        service: RawHandle,
        title: String,
        message: String,
    },
    NotifyFile {
        uri: String,
        message: String,
    },
    SetTileStatus {
        enabled: bool,
    },
    PrepareVpnPermission {
        activity: RawHandle,
        request_code: i32,
    },
    AttachPeer {
        activity: RawHandle,
    },
    ShowUrl {
        activity: RawHandle,
        url: String,
    },
    OpenFile {
        uri: String,
        mode: String,
    },
}

impl HostQuery {
    pub fn selector(&self) -> Selector {
        match self {
            HostQuery::Hostname => Selector::Hostname,
            HostQuery::OsVersion => Selector::OsVersion,
            HostQuery::ModelName => Selector::ModelName,
            HostQuery::IsTv => Selector::IsTv,
            HostQuery::IsChromeOs => Selector::IsChromeOs,
            HostQuery::PackageCertificate => Selector::PackageCertificate,
            HostQuery::InterfacesAsString => Selector::InterfacesAsString,
            HostQuery::UpdateStatusNotification { .. } => Selector::UpdateStatusNotification,
            HostQuery::PushNotify { .. } => Selector::PushNotify,
            HostQuery::NotifyFile { .. } => Selector::NotifyFile,
            HostQuery::SetTileStatus { .. } => Selector::SetTileStatus,
            HostQuery::PrepareVpnPermission { .. } => Selector::PrepareVpnPermission,
            HostQuery::AttachPeer { .. } => Selector::AttachPeer,
            HostQuery::ShowUrl { .. } => Selector::ShowUrl,
            HostQuery::OpenFile { .. } => Selector::OpenFile,
        }
    }
}

/// Typed answer from the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostValue {
    Unit,
    Bool(bool),
    Text(String),
    Bytes(Bytes),
    /// Detached file descriptor; ownership passes to the caller.
    Fd(i32),
}

impl HostValue {
    pub fn into_unit(self, selector: Selector) -> Result<()> {
        match self {
            HostValue::Unit => Ok(()),
            _ => Err(unexpected(selector, "unit")),
        }
    }

    pub fn into_bool(self, selector: Selector) -> Result<bool> {
        match self {
            HostValue::Bool(value) => Ok(value),
            _ => Err(unexpected(selector, "bool")),
        }
    }

    pub fn into_text(self, selector: Selector) -> Result<String> {
        match self {
            HostValue::Text(value) => Ok(value),
            _ => Err(unexpected(selector, "text")),
        }
    }

    pub fn into_bytes(self, selector: Selector) -> Result<Bytes> {
        match self {
            HostValue::Bytes(value) => Ok(value),
            _ => Err(unexpected(selector, "bytes")),
        }
    }

    pub fn into_fd(self, selector: Selector) -> Result<i32> {
        match self {
            HostValue::Fd(value) => Ok(value),
            _ => Err(unexpected(selector, "file descriptor")),
        }
    }
}

fn unexpected(selector: Selector, expected: &'static str) -> BridgeError {
    BridgeError::UnexpectedValue { selector, expected }
}

/// Host platform trait
///
/// Synchronous request/response calls into the host environment. Each call is
/// a full round trip across the language boundary and may block the caller
/// for its duration, so callers must not hold locks across it.
///
/// # Platform Support
///
/// - **Android**: JNI method calls on the application context or on a
///   service/activity object (`bridge-android`)
/// - **Tests**: `mockall` mocks or recording fakes
///
/// # Errors
///
/// - [`BridgeError::HostUnavailable`] when the boundary call fails
/// - [`BridgeError::InvalidHandle`] when a handle argument does not refer to a
///   live host object
/// - [`BridgeError::HostRejected`] when the host reports a failure
pub trait HostPlatform: PlatformSendSync {
    /// Perform one query.
    fn call(&self, query: HostQuery) -> Result<HostValue>;

    /// Selectors this host implements. Defaults to all of them.
    fn supported_selectors(&self) -> Vec<Selector> {
        Selector::ALL.to_vec()
    }
}
