//! Bridge lifecycle and the inbound callback surface.
//!
//! ```ignore
//! use core_bridge::{HostBridge, NullHandler};
//! use core_runtime::config::BridgeConfig;
//!
//! let config = BridgeConfig::builder().host(host).build()?;
//! let (bridge, inbound) = HostBridge::create(config);
//!
//! // Host callback threads get clones of `inbound`.
//! std::thread::spawn(move || inbound.signal_prepared());
//!
//! let handler = bridge.run(MyHandler::default()).await?;
//! ```
//!
//! [`HostBridge::shutdown`] stops the loop from any thread. It is idempotent
//! and does not interrupt a host query already in flight.

use std::fmt;
use std::sync::{Arc, Mutex};

use bridge_traits::HostHandle;
use chrono::{DateTime, Utc};
use core_async::handoff::{self, HandoffError, HandoffSender};
use core_async::signal::SignalChannel;
use core_async::slot::Slot;
use core_async::sync::CancellationToken;
use core_runtime::config::BridgeConfig;
use core_runtime::events::{BridgeEvent, EventBus, EventStream};
use tokio::sync::broadcast::Receiver;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::multiplexer::{AppHandler, EventLoop, Inbox, Preferences};
use crate::notifications::{ConnectionStatus, ExpiryThresholds, NotificationScheduler};
use crate::platform::PlatformQueries;

/// Inbound surface handed to host callback code and to the backend.
///
/// Cheap to clone. Every method except the two handoffs returns immediately
/// and never blocks; single-value inputs overwrite any value the loop has not
/// consumed yet.
#[derive(Clone)]
pub struct BridgeInbound {
    prepared: SignalChannel,
    revoked: SignalChannel,
    closed: SignalChannel,
    storage: SignalChannel,
    invalidate: SignalChannel,
    connectivity: Slot<bool>,
    preferences: Slot<Preferences>,
    browse_url: Slot<String>,
    expiry: Slot<Option<DateTime<Utc>>>,
    status: Slot<ConnectionStatus>,
    activity: Slot<HostHandle>,
    connect: HandoffSender<HostHandle>,
    disconnect: HandoffSender<HostHandle>,
}

impl BridgeInbound {
    /// The host granted VPN permission.
    pub fn signal_prepared(&self) {
        self.prepared.notify();
    }

    pub fn signal_revoked(&self) {
        self.revoked.notify();
    }

    /// VPN preparation failed or a running VPN was closed.
    pub fn signal_closed(&self) {
        self.closed.notify();
    }

    pub fn signal_storage_permission(&self) {
        self.storage.notify();
    }

    /// Ask the UI layer to refresh.
    pub fn invalidate(&self) {
        self.invalidate.notify();
    }

    pub fn signal_connectivity(&self, online: bool) {
        self.connectivity.put(online);
    }

    /// Hand a service reference to the loop, blocking until it is accepted.
    ///
    /// Call from host threads only, never from async code.
    ///
    /// # Errors
    ///
    /// Fails once the loop has shut down. A [`HandoffError::Closed`] gives
    /// the handle back; dropping it releases the reference.
    pub fn handoff_connect(
        &self,
        service: HostHandle,
    ) -> std::result::Result<(), HandoffError<HostHandle>> {
        debug!(service = %service.raw(), "Handing off service connect");
        self.connect.send_blocking(service)
    }

    /// Hand a disconnect request to the loop, blocking until it is accepted.
    ///
    /// Same contract as [`handoff_connect`](Self::handoff_connect).
    pub fn handoff_disconnect(
        &self,
        service: HostHandle,
    ) -> std::result::Result<(), HandoffError<HostHandle>> {
        debug!(service = %service.raw(), "Handing off service disconnect");
        self.disconnect.send_blocking(service)
    }

    /// Async form of [`handoff_connect`](Self::handoff_connect) for producers
    /// that already run on the runtime.
    pub async fn handoff_connect_async(
        &self,
        service: HostHandle,
    ) -> std::result::Result<(), HandoffError<HostHandle>> {
        self.connect.send(service).await
    }

    pub async fn handoff_disconnect_async(
        &self,
        service: HostHandle,
    ) -> std::result::Result<(), HandoffError<HostHandle>> {
        self.disconnect.send(service).await
    }

    pub fn set_preferences(&self, prefs: Preferences) {
        self.preferences.put(prefs);
    }

    /// Open `url` in the attached activity.
    pub fn set_browse_url(&self, url: impl Into<String>) {
        self.browse_url.put(url.into());
    }

    /// Update the session expiry. `None` cancels expiry alerts.
    pub fn set_expiry(&self, expiry: Option<DateTime<Utc>>) {
        self.expiry.put(expiry);
    }

    pub fn set_connection_status(&self, status: ConnectionStatus) {
        self.status.put(status);
    }

    /// Attach the current foreground activity.
    ///
    /// An activity the loop has not picked up yet is released right away.
    pub fn attach_activity(&self, activity: HostHandle) {
        if let Some(stale) = self.activity.put(activity) {
            debug!(activity = %stale.raw(), "Replacing unconsumed activity");
        }
    }
}

impl fmt::Debug for BridgeInbound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeInbound")
            .field("closed", &self.connect.is_closed())
            .finish_non_exhaustive()
    }
}

/// A Host Event Bridge instance.
pub struct HostBridge {
    inbound: BridgeInbound,
    inbox: Mutex<Option<Inbox>>,
    events: EventBus,
    shutdown: CancellationToken,
    platform: PlatformQueries,
    config: BridgeConfig,
}

impl HostBridge {
    /// Build a bridge and its inbound surface from a validated configuration.
    pub fn create(config: BridgeConfig) -> (Self, BridgeInbound) {
        let (connect_tx, connect_rx) = handoff::channel(config.handoff_capacity);
        let (disconnect_tx, disconnect_rx) = handoff::channel(config.handoff_capacity);

        let inbound = BridgeInbound {
            prepared: SignalChannel::new(),
            revoked: SignalChannel::new(),
            closed: SignalChannel::new(),
            storage: SignalChannel::new(),
            invalidate: SignalChannel::new(),
            connectivity: Slot::new(),
            preferences: Slot::new(),
            browse_url: Slot::new(),
            expiry: Slot::new(),
            status: Slot::new(),
            activity: Slot::new(),
            connect: connect_tx,
            disconnect: disconnect_tx,
        };

        let inbox = Inbox {
            prepared: inbound.prepared.clone(),
            revoked: inbound.revoked.clone(),
            closed: inbound.closed.clone(),
            storage: inbound.storage.clone(),
            invalidate: inbound.invalidate.clone(),
            connectivity: inbound.connectivity.clone(),
            preferences: inbound.preferences.clone(),
            browse_url: inbound.browse_url.clone(),
            expiry: inbound.expiry.clone(),
            status: inbound.status.clone(),
            activity: inbound.activity.clone(),
            connect: connect_rx,
            disconnect: disconnect_rx,
        };

        let bridge = Self {
            inbound: inbound.clone(),
            inbox: Mutex::new(Some(inbox)),
            events: EventBus::new(config.event_buffer),
            shutdown: CancellationToken::new(),
            platform: PlatformQueries::from_config(&config),
            config,
        };

        (bridge, inbound)
    }

    /// Another handle on the inbound surface.
    pub fn inbound(&self) -> BridgeInbound {
        self.inbound.clone()
    }

    /// Subscribe to lifecycle events and surfaced handler failures.
    pub fn events(&self) -> Receiver<BridgeEvent> {
        self.events.subscribe()
    }

    pub fn event_stream(&self) -> EventStream {
        EventStream::new(self.events.subscribe())
    }

    /// Query facade for use outside the loop.
    pub fn platform(&self) -> &PlatformQueries {
        &self.platform
    }

    /// Run the event loop until [`shutdown`](Self::shutdown).
    ///
    /// Returns the handler once the loop has stopped and released every
    /// handle it held.
    ///
    /// # Errors
    ///
    /// [`Error::AlreadyRunning`] if the loop was already started. A bridge
    /// runs at most once.
    pub async fn run<H: AppHandler>(&self, handler: H) -> Result<H> {
        let inbox = self
            .inbox
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
            .ok_or(Error::AlreadyRunning)?;

        let scheduler = NotificationScheduler::new(
            self.platform.clone(),
            Arc::clone(&self.config.clock),
            ExpiryThresholds::from_config(&self.config),
        );

        let event_loop = EventLoop::new(
            inbox,
            handler,
            self.platform.clone(),
            scheduler,
            self.events.clone(),
            self.shutdown.clone(),
            self.config.surface_errors,
        );

        Ok(event_loop.run().await)
    }

    /// Stop the event loop. Safe to call from any thread, any number of times.
    pub fn shutdown(&self) {
        if !self.shutdown.is_cancelled() {
            debug!("Bridge shutdown requested");
        }
        self.shutdown.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}

impl Drop for HostBridge {
    fn drop(&mut self) {
        if !self.shutdown.is_cancelled() {
            warn!("HostBridge dropped without shutdown");
            self.shutdown.cancel();
        }
    }
}

impl fmt::Debug for HostBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostBridge")
            .field("config", &self.config)
            .field("shut_down", &self.is_shut_down())
            .finish_non_exhaustive()
    }
}
