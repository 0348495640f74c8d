//! User-facing notifications.
//!
//! Two concerns live here:
//!
//! - The persistent status notification of the VPN service, derived from the
//!   backend's connection status by [`status_notification`].
//! - Session expiry alerts. [`plan_expiry`] is a pure function from an expiry
//!   deadline and "now" to a tier, an optional alert and an optional re-check
//!   delay. [`NotificationScheduler`] adds the single side effect (pushing the
//!   alert through the service) and makes sure each tier alerts at most once
//!   per deadline.
//!
//! | remaining `d`            | tier             | alert | re-check       |
//! |--------------------------|------------------|-------|----------------|
//! | `d <= 0`                 | `Expired`        | yes   | none           |
//! | `0 < d <= soon`          | `ExpiresSoon`    | yes   | `d`            |
//! | `soon < d <= warning`    | `ExpiresInADay`  | yes   | `d - soon`     |
//! | `d > warning`            | `Distant`        | no    | `d - warning`  |

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bridge_traits::{Clock, HostHandle, Result};
use chrono::{DateTime, TimeDelta, Utc};
use core_runtime::config::{BridgeConfig, DEFAULT_EXPIRY_SOON, DEFAULT_EXPIRY_WARNING};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::platform::PlatformQueries;

pub const EXPIRED_TITLE: &str = "Your authentication has expired!";
pub const EXPIRES_SOON_TITLE: &str = "Your authentication expires soon!";
pub const EXPIRES_IN_A_DAY_TITLE: &str = "Your authentication expires in a day.";
pub const REAUTHENTICATE_MESSAGE: &str =
    "Reauthenticate to maintain the connection to your network.";

// ============================================================================
// Status notification
// ============================================================================

/// Backend connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    NoState,
    NeedsLogin,
    NeedsMachineAuth,
    Stopped,
    Starting,
    Running,
}

/// State of the selected exit node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExitStatus {
    #[default]
    NotRunning,
    Offline,
    Online,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitPeer {
    pub label: String,
}

/// Snapshot of the backend's connection, pushed whenever it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub state: ConnectionState,
    #[serde(default)]
    pub exit_status: ExitStatus,
    #[serde(default)]
    pub exit_peer: Option<ExitPeer>,
}

impl ConnectionStatus {
    pub fn new(state: ConnectionState) -> Self {
        Self {
            state,
            exit_status: ExitStatus::NotRunning,
            exit_peer: None,
        }
    }

    pub fn with_exit(mut self, status: ExitStatus, label: impl Into<String>) -> Self {
        self.exit_status = status;
        self.exit_peer = Some(ExitPeer {
            label: label.into(),
        });
        self
    }
}

/// Title and body of a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationText {
    pub title: String,
    pub message: String,
}

impl NotificationText {
    fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }
}

/// Text of the persistent status notification, or `None` when the state
/// does not warrant an update.
pub fn status_notification(status: &ConnectionStatus) -> Option<NotificationText> {
    match status.state {
        ConnectionState::Starting => Some(NotificationText::new("Connecting...", "")),
        ConnectionState::Running => {
            let message = match (&status.exit_status, &status.exit_peer) {
                (ExitStatus::Online, Some(peer)) => format!("Exit node: {}", peer.label),
                _ => String::new(),
            };
            Some(NotificationText::new("Connected", message))
        }
        _ => None,
    }
}

// ============================================================================
// Expiry planning
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExpiryTier {
    Expired,
    ExpiresSoon,
    ExpiresInADay,
    Distant,
}

impl ExpiryTier {
    fn alert(self) -> Option<NotificationText> {
        let title = match self {
            ExpiryTier::Expired => EXPIRED_TITLE,
            ExpiryTier::ExpiresSoon => EXPIRES_SOON_TITLE,
            ExpiryTier::ExpiresInADay => EXPIRES_IN_A_DAY_TITLE,
            ExpiryTier::Distant => return None,
        };
        Some(NotificationText::new(title, REAUTHENTICATE_MESSAGE))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryThresholds {
    pub soon: Duration,
    pub warning: Duration,
}

impl Default for ExpiryThresholds {
    fn default() -> Self {
        Self {
            soon: DEFAULT_EXPIRY_SOON,
            warning: DEFAULT_EXPIRY_WARNING,
        }
    }
}

impl ExpiryThresholds {
    pub fn from_config(config: &BridgeConfig) -> Self {
        Self {
            soon: config.expiry_soon,
            warning: config.expiry_warning,
        }
    }
}

/// Outcome of classifying an expiry deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpiryPlan {
    pub expires_at: DateTime<Utc>,
    pub tier: ExpiryTier,
    /// Alert to show now, if the tier has one
    pub alert: Option<NotificationText>,
    /// When to classify again
    pub recheck_in: Option<Duration>,
}

/// Classify `expiry` relative to `now`.
///
/// Returns `None` for an unset deadline, including the Unix epoch, which the
/// backend uses as its zero value.
pub fn plan_expiry(
    expiry: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    thresholds: ExpiryThresholds,
) -> Option<ExpiryPlan> {
    let expires_at = expiry.filter(|at| at.timestamp() != 0)?;
    let remaining = expires_at - now;
    let soon = delta(thresholds.soon);
    let warning = delta(thresholds.warning);

    let (tier, recheck) = if remaining <= TimeDelta::zero() {
        (ExpiryTier::Expired, None)
    } else if remaining <= soon {
        (ExpiryTier::ExpiresSoon, Some(remaining))
    } else if remaining <= warning {
        (ExpiryTier::ExpiresInADay, Some(remaining - soon))
    } else {
        (ExpiryTier::Distant, Some(remaining - warning))
    };

    Some(ExpiryPlan {
        expires_at,
        tier,
        alert: tier.alert(),
        recheck_in: recheck.and_then(|d| d.to_std().ok()),
    })
}

fn delta(duration: Duration) -> TimeDelta {
    TimeDelta::from_std(duration).unwrap_or(TimeDelta::MAX)
}

/// Expiry alerting with per-tier deduplication.
pub struct NotificationScheduler {
    platform: PlatformQueries,
    clock: Arc<dyn Clock>,
    thresholds: ExpiryThresholds,
    last_alert: Option<(DateTime<Utc>, ExpiryTier)>,
}

impl NotificationScheduler {
    pub fn new(
        platform: PlatformQueries,
        clock: Arc<dyn Clock>,
        thresholds: ExpiryThresholds,
    ) -> Self {
        Self {
            platform,
            clock,
            thresholds,
            last_alert: None,
        }
    }

    /// Classify `expiry` against the current time.
    pub fn plan(&self, expiry: Option<DateTime<Utc>>) -> Option<ExpiryPlan> {
        plan_expiry(expiry, self.clock.now(), self.thresholds)
    }

    /// Push the plan's alert through `service` unless this tier was already
    /// shown for this deadline.
    ///
    /// Returns the alert that was shown. Without a service there is nowhere
    /// to post; the alert is skipped and can fire on a later check.
    pub fn deliver(
        &mut self,
        plan: &ExpiryPlan,
        service: Option<&HostHandle>,
    ) -> Result<Option<NotificationText>> {
        let Some(alert) = plan.alert.as_ref() else {
            return Ok(None);
        };

        let key = (plan.expires_at, plan.tier);
        if self.last_alert == Some(key) {
            debug!(tier = ?plan.tier, "Expiry alert already shown");
            return Ok(None);
        }

        let Some(service) = service else {
            warn!(tier = ?plan.tier, "No service connected, skipping expiry alert");
            return Ok(None);
        };

        self.platform
            .push_notify(service, &alert.title, &alert.message)?;
        self.last_alert = Some(key);
        Ok(Some(alert.clone()))
    }
}

impl fmt::Debug for NotificationScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationScheduler")
            .field("thresholds", &self.thresholds)
            .field("last_alert", &self.last_alert)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::{
        HandleReleaser, HostPlatform, HostQuery, HostValue, ManualClock, RawHandle, Selector,
    };
    use chrono::TimeZone;
    use mockall::mock;

    mock! {
        Host {}

        impl HostPlatform for Host {
            fn call(&self, query: HostQuery) -> Result<HostValue>;
            fn supported_selectors(&self) -> Vec<Selector>;
        }
    }

    struct NoopReleaser;

    impl HandleReleaser for NoopReleaser {
        fn release(&self, _raw: RawHandle) {}
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()
    }

    fn minutes(n: i64) -> TimeDelta {
        TimeDelta::try_minutes(n).unwrap()
    }

    fn plan_at(offset: TimeDelta) -> ExpiryPlan {
        plan_expiry(Some(t0() + offset), t0(), ExpiryThresholds::default()).unwrap()
    }

    #[test]
    fn test_status_notification_text() {
        assert_eq!(
            status_notification(&ConnectionStatus::new(ConnectionState::Starting)),
            Some(NotificationText::new("Connecting...", ""))
        );
        assert_eq!(
            status_notification(
                &ConnectionStatus::new(ConnectionState::Running)
                    .with_exit(ExitStatus::Online, "nyc-exit")
            ),
            Some(NotificationText::new("Connected", "Exit node: nyc-exit"))
        );
        assert_eq!(
            status_notification(
                &ConnectionStatus::new(ConnectionState::Running)
                    .with_exit(ExitStatus::Offline, "nyc-exit")
            ),
            Some(NotificationText::new("Connected", ""))
        );
        assert_eq!(
            status_notification(&ConnectionStatus::new(ConnectionState::NeedsLogin)),
            None
        );
        assert_eq!(
            status_notification(&ConnectionStatus::new(ConnectionState::Stopped)),
            None
        );
    }

    #[test]
    fn test_expires_soon() {
        let plan = plan_at(minutes(3));
        assert_eq!(plan.tier, ExpiryTier::ExpiresSoon);
        assert_eq!(plan.alert.unwrap().title, EXPIRES_SOON_TITLE);
        assert_eq!(plan.recheck_in, Some(Duration::from_secs(180)));
    }

    #[test]
    fn test_expires_in_a_day() {
        let plan = plan_at(TimeDelta::try_hours(12).unwrap());
        assert_eq!(plan.tier, ExpiryTier::ExpiresInADay);
        let alert = plan.alert.unwrap();
        assert_eq!(alert.title, EXPIRES_IN_A_DAY_TITLE);
        assert_eq!(alert.message, REAUTHENTICATE_MESSAGE);
        assert_eq!(
            plan.recheck_in,
            Some(Duration::from_secs(12 * 3600 - 5 * 60))
        );
    }

    #[test]
    fn test_expired_is_terminal() {
        for offset in [TimeDelta::zero(), minutes(-10)] {
            let plan = plan_at(offset);
            assert_eq!(plan.tier, ExpiryTier::Expired);
            assert_eq!(plan.alert.unwrap().title, EXPIRED_TITLE);
            assert_eq!(plan.recheck_in, None);
        }
    }

    #[test]
    fn test_distant_expiry_rechecks_silently() {
        let plan = plan_at(TimeDelta::try_days(3).unwrap());
        assert_eq!(plan.tier, ExpiryTier::Distant);
        assert!(plan.alert.is_none());
        assert_eq!(plan.recheck_in, Some(Duration::from_secs(2 * 86_400)));
    }

    #[test]
    fn test_tier_boundaries_are_inclusive() {
        assert_eq!(plan_at(minutes(5)).tier, ExpiryTier::ExpiresSoon);
        assert_eq!(plan_at(TimeDelta::try_hours(24).unwrap()).tier, ExpiryTier::ExpiresInADay);
        assert_eq!(plan_at(minutes(24 * 60 + 1)).tier, ExpiryTier::Distant);
    }

    #[test]
    fn test_unset_expiry_plans_nothing() {
        let thresholds = ExpiryThresholds::default();
        assert!(plan_expiry(None, t0(), thresholds).is_none());
        assert!(plan_expiry(Some(DateTime::UNIX_EPOCH), t0(), thresholds).is_none());
    }

    #[test]
    fn test_custom_thresholds() {
        let thresholds = ExpiryThresholds {
            soon: Duration::from_secs(60),
            warning: Duration::from_secs(600),
        };
        let plan = plan_expiry(Some(t0() + minutes(3)), t0(), thresholds).unwrap();
        assert_eq!(plan.tier, ExpiryTier::ExpiresInADay);
        assert_eq!(plan.recheck_in, Some(Duration::from_secs(120)));
    }

    #[test]
    fn test_scheduler_alerts_once_per_tier() {
        let mut host = MockHost::new();
        host.expect_supported_selectors()
            .returning(|| Selector::ALL.to_vec());
        host.expect_call()
            .withf(|query| matches!(query, HostQuery::PushNotify { .. }))
            .times(2)
            .returning(|_| Ok(HostValue::Unit));

        let clock = Arc::new(ManualClock::new(t0()));
        let platform = PlatformQueries::new(
            Arc::new(host),
            core_runtime::config::DEFAULT_RELEASE_FINGERPRINT,
        );
        let mut scheduler =
            NotificationScheduler::new(platform, clock.clone(), ExpiryThresholds::default());
        let service = HostHandle::adopt(3, "service", Arc::new(NoopReleaser)).unwrap();
        let expiry = Some(t0() + TimeDelta::try_hours(2).unwrap());

        let plan = scheduler.plan(expiry).unwrap();
        assert!(scheduler.deliver(&plan, Some(&service)).unwrap().is_some());

        // Same deadline, same tier: no second alert.
        clock.advance(minutes(30));
        let plan = scheduler.plan(expiry).unwrap();
        assert!(scheduler.deliver(&plan, Some(&service)).unwrap().is_none());

        // Crossing into the next tier alerts again.
        clock.advance(minutes(88));
        let plan = scheduler.plan(expiry).unwrap();
        assert_eq!(plan.tier, ExpiryTier::ExpiresSoon);
        let alert = scheduler.deliver(&plan, Some(&service)).unwrap().unwrap();
        assert_eq!(alert.title, EXPIRES_SOON_TITLE);
    }

    #[test]
    fn test_scheduler_without_service_skips_and_retries() {
        let mut host = MockHost::new();
        host.expect_supported_selectors()
            .returning(|| Selector::ALL.to_vec());
        host.expect_call().times(1).returning(|_| Ok(HostValue::Unit));

        let platform = PlatformQueries::new(
            Arc::new(host),
            core_runtime::config::DEFAULT_RELEASE_FINGERPRINT,
        );
        let mut scheduler = NotificationScheduler::new(
            platform,
            Arc::new(ManualClock::new(t0())),
            ExpiryThresholds::default(),
        );
        let plan = scheduler.plan(Some(t0() - minutes(1))).unwrap();

        assert!(scheduler.deliver(&plan, None).unwrap().is_none());

        let service = HostHandle::adopt(3, "service", Arc::new(NoopReleaser)).unwrap();
        assert!(scheduler.deliver(&plan, Some(&service)).unwrap().is_some());
    }
}
