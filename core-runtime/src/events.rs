//! # Event Bus System
//!
//! Publishes bridge lifecycle facts and handler failures to UI subscribers
//! using `tokio::sync::broadcast`.
//!
//! ## Overview
//!
//! The event loop swallows handler errors so a misbehaving handler never
//! stops it. Logging alone leaves the UI blind, so every failure is also
//! published here as [`BridgeEvent::HandlerFailed`], next to the lifecycle
//! facts the loop already knows about (VPN prepared, service connected,
//! expiry alert shown, loop stopped).
//!
//! ```text
//! ┌──────────────┐   emit    ┌───────────┐  subscribe  ┌────────────┐
//! │ Event loop   ├──────────>│ EventBus  ├────────────>│ UI layer   │
//! └──────────────┘           │(broadcast)│             └────────────┘
//!                            └───────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{BridgeEvent, EventBus, EventStream, EventSeverity};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus = EventBus::new(100);
//! let mut failures = EventStream::new(bus.subscribe())
//!     .filter(|event| event.severity() >= EventSeverity::Error);
//!
//! bus.emit(BridgeEvent::VpnPrepared).ok();
//! bus.emit(BridgeEvent::HandlerFailed {
//!     event: "preferences".to_string(),
//!     message: "backend refused".to_string(),
//! })
//! .ok();
//!
//! let event = failures.recv().await.unwrap();
//! assert!(matches!(event, BridgeEvent::HandlerFailed { .. }));
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber missed `n` events. Non-fatal.
//! - **`RecvError::Closed`**: the bridge was dropped. Treat as shutdown.
//!
//! Emitting with no subscribers returns an error that publishers ignore.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast::{self, error::RecvError, error::SendError, Receiver};

/// Default per-subscriber buffer.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

/// Events published by the bridge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum BridgeEvent {
    /// The host granted VPN permission
    VpnPrepared,
    /// The host revoked VPN permission
    VpnRevoked,
    /// The VPN service was torn down by the host
    VpnClosed,
    StoragePermissionGranted,
    Connectivity { online: bool },
    /// A service handle was accepted from the host
    ServiceConnected,
    /// A service handle was released
    ServiceDisconnected,
    /// A session expiry alert was pushed to the user
    ExpiryAlert {
        title: String,
        expires_at: DateTime<Utc>,
    },
    /// An application handler returned an error; the loop kept running
    HandlerFailed { event: String, message: String },
    /// The event loop exited after shutdown
    Stopped,
}

impl BridgeEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            BridgeEvent::VpnPrepared => "VPN permission granted",
            BridgeEvent::VpnRevoked => "VPN permission revoked",
            BridgeEvent::VpnClosed => "VPN service closed",
            BridgeEvent::StoragePermissionGranted => "Storage permission granted",
            BridgeEvent::Connectivity { online: true } => "Network reachable",
            BridgeEvent::Connectivity { online: false } => "Network unreachable",
            BridgeEvent::ServiceConnected => "Service connected",
            BridgeEvent::ServiceDisconnected => "Service disconnected",
            BridgeEvent::ExpiryAlert { .. } => "Session expiry alert shown",
            BridgeEvent::HandlerFailed { .. } => "Handler failed",
            BridgeEvent::Stopped => "Bridge stopped",
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            BridgeEvent::HandlerFailed { .. } => EventSeverity::Error,
            BridgeEvent::VpnRevoked | BridgeEvent::ExpiryAlert { .. } => EventSeverity::Warning,
            BridgeEvent::Connectivity { .. } => EventSeverity::Debug,
            _ => EventSeverity::Info,
        }
    }
}

/// Event severity levels for filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

/// Central event bus.
///
/// Cloning is cheap; clones publish to the same subscribers. Slow subscribers
/// receive `RecvError::Lagged` instead of blocking the publisher.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<BridgeEvent>,
}

impl EventBus {
    /// Creates a new event bus.
    ///
    /// `capacity` is the number of events buffered per subscriber before it
    /// starts lagging.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an
    /// error if there are none.
    pub fn emit(&self, event: BridgeEvent) -> Result<usize, SendError<BridgeEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<BridgeEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

type EventFilter = Box<dyn Fn(&BridgeEvent) -> bool + Send + Sync>;

/// A `broadcast::Receiver` with optional filtering.
pub struct EventStream {
    receiver: Receiver<BridgeEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<BridgeEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` are returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&BridgeEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &BridgeEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter.
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n` events.
    /// Returns `RecvError::Closed` if the bus was dropped.
    pub async fn recv(&mut self) -> Result<BridgeEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive an event without waiting.
    ///
    /// Returns `None` if no matching event is currently available.
    pub fn try_recv(&mut self) -> Option<Result<BridgeEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}
