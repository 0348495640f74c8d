//! Task spawning.
//!
//! `spawn_blocking` matters here: host callbacks that hand off handles block
//! until the loop accepts them, so tests and adapters run them on the blocking
//! pool rather than on an executor thread.

pub use tokio::task::{spawn, spawn_blocking, yield_now, JoinError, JoinHandle};

/// Result type for task operations.
pub type Result<T> = std::result::Result<T, JoinError>;
