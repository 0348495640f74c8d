//! Owned references to host-side objects.
//!
//! A host object (a VPN service, an activity, ...) crosses the boundary as an
//! opaque [`RawHandle`]. On the Rust side it is always wrapped in a
//! [`HostHandle`], which releases the host reference exactly once when dropped.
//! There is no way to copy a `HostHandle`, so ownership follows moves: the
//! host callback owns it until it hands it to a channel, the receiving side
//! owns it afterwards.

use std::fmt;
use std::num::NonZeroU64;
use std::sync::Arc;

use crate::{
    error::{BridgeError, Result},
    platform::PlatformSendSync,
};

/// Opaque, non-null identifier of a host object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RawHandle(NonZeroU64);

impl RawHandle {
    /// Wrap a raw host identifier, rejecting the null sentinel.
    pub fn new(raw: u64) -> Result<Self> {
        NonZeroU64::new(raw)
            .map(Self)
            .ok_or_else(|| BridgeError::InvalidHandle("null host reference".to_string()))
    }

    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for RawHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Releases host references when their [`HostHandle`] is dropped.
///
/// Implemented by the host adapter, e.g. by deleting a JNI global reference.
pub trait HandleReleaser: PlatformSendSync {
    fn release(&self, raw: RawHandle);
}

/// Owned host reference. Dropping it releases the reference on the host.
pub struct HostHandle {
    raw: RawHandle,
    kind: &'static str,
    releaser: Arc<dyn HandleReleaser>,
}

impl HostHandle {
    /// Take ownership of a host reference.
    ///
    /// `kind` is a short label ("service", "activity") used in logs.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::InvalidHandle`] if `raw` is zero. Nothing is
    /// released in that case since there is nothing to release.
    pub fn adopt(raw: u64, kind: &'static str, releaser: Arc<dyn HandleReleaser>) -> Result<Self> {
        let raw = RawHandle::new(raw)
            .map_err(|_| BridgeError::InvalidHandle(format!("null {kind} reference")))?;
        Ok(Self {
            raw,
            kind,
            releaser,
        })
    }

    pub fn raw(&self) -> RawHandle {
        self.raw
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }
}

impl Drop for HostHandle {
    fn drop(&mut self) {
        self.releaser.release(self.raw);
    }
}

impl fmt::Debug for HostHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostHandle")
            .field("raw", &self.raw)
            .field("kind", &self.kind)
            .finish()
    }
}
