//! Marker traits that keep bridge trait bounds in one place.
//!
//! Host callbacks arrive on arbitrary platform threads, so everything that
//! crosses the boundary must be shareable across threads.

/// Marker trait for `Send + Sync` bridge implementations.
pub trait PlatformSendSync: Send + Sync {}

impl<T> PlatformSendSync for T where T: Send + Sync {}

/// Marker trait for values that only need to move between threads.
pub trait PlatformSend: Send {}

impl<T> PlatformSend for T where T: Send {}
