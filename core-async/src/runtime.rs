//! Runtime utilities that wrap the underlying executor so downstream crates
//! never need to depend on Tokio directly.

pub use tokio::runtime::{Builder, Handle, Runtime};

/// Build a single-threaded runtime with IO and timers enabled.
///
/// Host adapters use this to drive the bridge loop on a dedicated thread.
pub fn current_thread() -> std::io::Result<Runtime> {
    Builder::new_current_thread().enable_all().build()
}

/// Runs the provided future to completion on a throwaway runtime.
///
/// Must not be called from within an async context.
pub fn block_on<F>(future: F) -> std::io::Result<F::Output>
where
    F: std::future::Future,
{
    Ok(current_thread()?.block_on(future))
}
