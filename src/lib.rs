//! Workspace placeholder crate.
//!
//! Exposes feature flags that map onto the individual workspace crates so a
//! host application can depend on `hostlink-workspace` alone:
//!
//! - `bridge` (default): the host event bridge from `core-bridge`
//! - `android`: additionally links the JNI adapter from `bridge-android`

#[cfg(feature = "bridge")]
pub use core_bridge as bridge;

#[cfg(feature = "android")]
pub use bridge_android as android;
