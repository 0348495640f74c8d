//! Time-related re-exports.
//!
//! `Instant` is Tokio's so deadlines work with `sleep_until` and with paused
//! test time.

pub use tokio::time::{interval, sleep, sleep_until, timeout, Instant, Interval, Sleep, Timeout};

pub use std::time::Duration;
