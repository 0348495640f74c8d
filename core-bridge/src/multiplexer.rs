//! # Event Multiplexer
//!
//! The single control loop of the bridge. It waits on every inbound channel
//! at once, takes exactly one ready value per iteration, and dispatches it to
//! the application's [`AppHandler`] before looping.
//!
//! ## Semantics
//!
//! - Selection among simultaneously ready channels is random; there is no
//!   priority between them.
//! - Handler errors are logged at `error` level and, when enabled, published
//!   as [`BridgeEvent::HandlerFailed`]. They never stop the loop.
//! - The loop owns the current service and activity handles. Replacing one
//!   releases the previous handle, and every handle the loop holds or still
//!   has queued is released before [`EventLoop::run`] returns.
//!
//! ## Dispatch table
//!
//! | inbound value | loop action | handler |
//! |---|---|---|
//! | prepared / revoked / closed signal | publish event | `on_vpn_*` |
//! | storage permission signal | publish event | `on_storage_permission` |
//! | invalidate signal | | `on_invalidate` |
//! | connectivity | publish event | `on_connectivity` |
//! | preferences | `setTileStatus(want_running)` | `on_preferences` |
//! | browse URL | `showURL` on the attached activity | |
//! | activity | release previous, `attachPeer` | |
//! | connection status | `updateStatusNotification` | |
//! | expiry / re-check timer | expiry alert, re-arm timer | |
//! | connect handoff | adopt service, re-check expiry | `on_connect` |
//! | disconnect handoff | drop service | `on_disconnect` |

use std::fmt;
use std::pin::Pin;

use async_trait::async_trait;
use bridge_traits::HostHandle;
use chrono::{DateTime, Utc};
use core_async::handoff::HandoffReceiver;
use core_async::signal::SignalChannel;
use core_async::slot::Slot;
use core_async::sync::CancellationToken;
use core_async::time::{sleep, Sleep};
use core_runtime::events::{BridgeEvent, EventBus};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument};

use crate::notifications::{status_notification, ConnectionStatus, NotificationScheduler};
use crate::platform::PlatformQueries;

/// Desired configuration pushed by the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    /// Whether the user wants the VPN up
    pub want_running: bool,
    #[serde(default)]
    pub exit_node_id: Option<String>,
    #[serde(default)]
    pub route_all: bool,
    #[serde(default)]
    pub corp_dns: bool,
}

/// What a handler can see and use while it runs.
pub struct BridgeContext<'a> {
    pub platform: &'a PlatformQueries,
    /// The connected VPN service, if any
    pub service: Option<&'a HostHandle>,
    /// The most recently attached activity, if any
    pub activity: Option<&'a HostHandle>,
}

impl fmt::Debug for BridgeContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeContext")
            .field("service", &self.service)
            .field("activity", &self.activity)
            .finish_non_exhaustive()
    }
}

/// Application callbacks driven by the event loop.
///
/// Every method defaults to doing nothing. Handlers run on the loop itself,
/// so they must not block indefinitely; a handler that queries the host
/// blocks for that round trip.
#[async_trait]
pub trait AppHandler: Send {
    async fn on_vpn_prepared(&mut self, _ctx: &BridgeContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_vpn_revoked(&mut self, _ctx: &BridgeContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_vpn_closed(&mut self, _ctx: &BridgeContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_storage_permission(&mut self, _ctx: &BridgeContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// The UI asked for a refresh.
    async fn on_invalidate(&mut self, _ctx: &BridgeContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_connectivity(
        &mut self,
        _ctx: &BridgeContext<'_>,
        _online: bool,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called after the tile status has been updated.
    async fn on_preferences(
        &mut self,
        _ctx: &BridgeContext<'_>,
        _prefs: Preferences,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    /// A service connected; `ctx.service` is the new service.
    async fn on_connect(&mut self, _ctx: &BridgeContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// A service asked to disconnect.
    ///
    /// `service` is the reference handed over with the request and is released
    /// when dropped. `ctx.service` is already cleared.
    async fn on_disconnect(
        &mut self,
        _ctx: &BridgeContext<'_>,
        _service: HostHandle,
    ) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Handler that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullHandler;

impl AppHandler for NullHandler {}

/// Receiving ends of every inbound channel. Owned by the loop.
pub(crate) struct Inbox {
    pub(crate) prepared: SignalChannel,
    pub(crate) revoked: SignalChannel,
    pub(crate) closed: SignalChannel,
    pub(crate) storage: SignalChannel,
    pub(crate) invalidate: SignalChannel,
    pub(crate) connectivity: Slot<bool>,
    pub(crate) preferences: Slot<Preferences>,
    pub(crate) browse_url: Slot<String>,
    pub(crate) expiry: Slot<Option<DateTime<Utc>>>,
    pub(crate) status: Slot<ConnectionStatus>,
    pub(crate) activity: Slot<HostHandle>,
    pub(crate) connect: HandoffReceiver<HostHandle>,
    pub(crate) disconnect: HandoffReceiver<HostHandle>,
}

enum Wake {
    Shutdown,
    VpnPrepared,
    VpnRevoked,
    VpnClosed,
    StoragePermission,
    Invalidate,
    Connectivity(bool),
    Preferences(Preferences),
    BrowseUrl(String),
    Expiry(Option<DateTime<Utc>>),
    Status(ConnectionStatus),
    Activity(HostHandle),
    Connect(HostHandle),
    Disconnect(HostHandle),
    Recheck,
}

macro_rules! ctx {
    ($loop:expr) => {
        BridgeContext {
            platform: &$loop.platform,
            service: $loop.service.as_ref(),
            activity: $loop.activity.as_ref(),
        }
    };
}

pub(crate) struct EventLoop<H> {
    inbox: Inbox,
    handler: H,
    platform: PlatformQueries,
    scheduler: NotificationScheduler,
    events: EventBus,
    shutdown: CancellationToken,
    surface_errors: bool,
    service: Option<HostHandle>,
    activity: Option<HostHandle>,
    expiry: Option<DateTime<Utc>>,
    recheck: Option<Pin<Box<Sleep>>>,
}

impl<H: AppHandler> EventLoop<H> {
    pub(crate) fn new(
        inbox: Inbox,
        handler: H,
        platform: PlatformQueries,
        scheduler: NotificationScheduler,
        events: EventBus,
        shutdown: CancellationToken,
        surface_errors: bool,
    ) -> Self {
        Self {
            inbox,
            handler,
            platform,
            scheduler,
            events,
            shutdown,
            surface_errors,
            service: None,
            activity: None,
            expiry: None,
            recheck: None,
        }
    }

    /// Drive the loop until shutdown, then release everything and hand the
    /// handler back.
    #[instrument(name = "multiplexer", skip_all)]
    pub(crate) async fn run(mut self) -> H {
        info!("Event loop started");

        loop {
            let wake = self.next().await;
            if matches!(wake, Wake::Shutdown) {
                break;
            }
            self.dispatch(wake).await;
        }

        self.release_all().await;
        self.publish(BridgeEvent::Stopped);
        info!("Event loop stopped");
        self.handler
    }

    async fn next(&mut self) -> Wake {
        let inbox = &mut self.inbox;
        tokio::select! {
            _ = self.shutdown.cancelled() => Wake::Shutdown,
            _ = inbox.prepared.wait() => Wake::VpnPrepared,
            _ = inbox.revoked.wait() => Wake::VpnRevoked,
            _ = inbox.closed.wait() => Wake::VpnClosed,
            _ = inbox.storage.wait() => Wake::StoragePermission,
            _ = inbox.invalidate.wait() => Wake::Invalidate,
            online = inbox.connectivity.recv() => Wake::Connectivity(online),
            prefs = inbox.preferences.recv() => Wake::Preferences(prefs),
            url = inbox.browse_url.recv() => Wake::BrowseUrl(url),
            expiry = inbox.expiry.recv() => Wake::Expiry(expiry),
            status = inbox.status.recv() => Wake::Status(status),
            activity = inbox.activity.recv() => Wake::Activity(activity),
            Some(service) = inbox.connect.recv() => Wake::Connect(service),
            Some(service) = inbox.disconnect.recv() => Wake::Disconnect(service),
            _ = recheck_due(&mut self.recheck) => Wake::Recheck,
        }
    }

    async fn dispatch(&mut self, wake: Wake) {
        match wake {
            Wake::Shutdown => {}
            Wake::VpnPrepared => {
                debug!("VPN prepared");
                self.publish(BridgeEvent::VpnPrepared);
                let result = self.handler.on_vpn_prepared(&ctx!(self)).await;
                self.report("vpn_prepared", result);
            }
            Wake::VpnRevoked => {
                debug!("VPN revoked");
                self.publish(BridgeEvent::VpnRevoked);
                let result = self.handler.on_vpn_revoked(&ctx!(self)).await;
                self.report("vpn_revoked", result);
            }
            Wake::VpnClosed => {
                debug!("VPN closed");
                self.publish(BridgeEvent::VpnClosed);
                let result = self.handler.on_vpn_closed(&ctx!(self)).await;
                self.report("vpn_closed", result);
            }
            Wake::StoragePermission => {
                self.publish(BridgeEvent::StoragePermissionGranted);
                let result = self.handler.on_storage_permission(&ctx!(self)).await;
                self.report("storage_permission", result);
            }
            Wake::Invalidate => {
                let result = self.handler.on_invalidate(&ctx!(self)).await;
                self.report("invalidate", result);
            }
            Wake::Connectivity(online) => {
                debug!(online, "Connectivity changed");
                self.publish(BridgeEvent::Connectivity { online });
                let result = self.handler.on_connectivity(&ctx!(self), online).await;
                self.report("connectivity", result);
            }
            Wake::Preferences(prefs) => {
                let tile = self.platform.set_tile_status(prefs.want_running);
                self.report("preferences", tile);
                let result = self.handler.on_preferences(&ctx!(self), prefs).await;
                self.report("preferences", result);
            }
            Wake::BrowseUrl(url) => match self.activity.as_ref() {
                Some(activity) => {
                    let shown = self.platform.show_url(activity, &url);
                    self.report("browse_url", shown);
                }
                None => debug!("No activity attached, dropping browse URL"),
            },
            Wake::Expiry(expiry) => {
                self.expiry = expiry;
                self.check_expiry();
            }
            Wake::Status(status) => self.update_status(&status),
            Wake::Activity(activity) => {
                debug!(activity = %activity.raw(), "Activity attached");
                // Replacing releases the previous activity.
                self.activity = Some(activity);
                if let Some(activity) = self.activity.as_ref() {
                    let attached = self.platform.attach_peer(activity);
                    self.report("activity", attached);
                }
            }
            Wake::Connect(service) => {
                info!(service = %service.raw(), "Service connected");
                self.service = Some(service);
                self.publish(BridgeEvent::ServiceConnected);
                let result = self.handler.on_connect(&ctx!(self)).await;
                self.report("connect", result);
                self.check_expiry();
            }
            Wake::Disconnect(request) => {
                info!(service = %request.raw(), "Service disconnecting");
                let previous = self.service.take();
                self.publish(BridgeEvent::ServiceDisconnected);
                let result = self.handler.on_disconnect(&ctx!(self), request).await;
                self.report("disconnect", result);
                drop(previous);
            }
            Wake::Recheck => {
                self.recheck = None;
                self.check_expiry();
            }
        }
    }

    fn update_status(&mut self, status: &ConnectionStatus) {
        let Some(text) = status_notification(status) else {
            return;
        };
        match self.service.as_ref() {
            Some(service) => {
                let updated =
                    self.platform
                        .update_status_notification(service, &text.title, &text.message);
                self.report("status", updated);
            }
            None => debug!(state = ?status.state, "No service connected, skipping status notification"),
        }
    }

    fn check_expiry(&mut self) {
        let Some(plan) = self.scheduler.plan(self.expiry) else {
            self.recheck = None;
            return;
        };

        debug!(tier = ?plan.tier, recheck_in = ?plan.recheck_in, "Expiry checked");
        self.recheck = plan.recheck_in.map(|delay| Box::pin(sleep(delay)));

        match self.scheduler.deliver(&plan, self.service.as_ref()) {
            Ok(Some(alert)) => self.publish(BridgeEvent::ExpiryAlert {
                title: alert.title,
                expires_at: plan.expires_at,
            }),
            Ok(None) => {}
            Err(err) => self.report::<(), _>("expiry", Err(err)),
        }
    }

    fn report<T, E: fmt::Display>(&self, event: &'static str, result: Result<T, E>) {
        let Err(err) = result else {
            return;
        };
        error!(event, error = %err, "Handler failed");
        if self.surface_errors {
            self.publish(BridgeEvent::HandlerFailed {
                event: event.to_string(),
                message: err.to_string(),
            });
        }
    }

    fn publish(&self, event: BridgeEvent) {
        // No subscribers is fine.
        let _ = self.events.emit(event);
    }

    async fn release_all(&mut self) {
        self.recheck = None;
        drop(self.activity.take());
        drop(self.service.take());
        drop(self.inbox.activity.take());

        // Accept whatever is still queued so blocked senders return, then
        // release it.
        for receiver in [&mut self.inbox.connect, &mut self.inbox.disconnect] {
            receiver.close();
            while let Some(handle) = receiver.recv().await {
                debug!(handle = %handle.raw(), "Releasing queued handle");
            }
        }
    }
}

async fn recheck_due(timer: &mut Option<Pin<Box<Sleep>>>) {
    match timer {
        Some(sleep) => sleep.as_mut().await,
        None => std::future::pending().await,
    }
}
