//! Table of host objects pinned by the bridge.
//!
//! JNI local references die with the callback that produced them, so every
//! object the bridge keeps (a service, an activity) is promoted to a
//! `GlobalRef` and parked here under a fresh non-zero id. The id is what
//! travels through the core as a [`RawHandle`]; dropping the owning
//! [`HostHandle`] removes the entry, which deletes the global reference.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use bridge_traits::{BridgeError, HandleReleaser, HostHandle, RawHandle, Result};
use jni::objects::{GlobalRef, JObject};
use jni::JNIEnv;
use tracing::{trace, warn};

pub struct HandleTable<T = GlobalRef> {
    next: AtomicU64,
    entries: Mutex<HashMap<u64, T>>,
}

impl<T> HandleTable<T> {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Park `value` and return its id. Ids are never zero and never reused.
    pub fn insert(&self, value: T) -> Result<RawHandle> {
        let raw = RawHandle::new(self.next.fetch_add(1, Ordering::Relaxed))?;
        self.entries().insert(raw.get(), value);
        trace!(handle = %raw, "Pinned host object");
        Ok(raw)
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<u64, T>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl<T: Clone> HandleTable<T> {
    /// Look up a pinned object.
    ///
    /// # Errors
    ///
    /// [`BridgeError::InvalidHandle`] if `raw` was never issued or has already
    /// been released.
    pub fn get(&self, raw: RawHandle) -> Result<T> {
        self.entries()
            .get(&raw.get())
            .cloned()
            .ok_or_else(|| BridgeError::InvalidHandle(format!("stale host handle {raw}")))
    }
}

impl<T: Send + Sync + 'static> HandleTable<T> {
    /// Park `value` and wrap its id in an owned handle that unpins it on drop.
    pub fn adopt(self: &Arc<Self>, value: T, kind: &'static str) -> Result<HostHandle> {
        let raw = self.insert(value)?;
        let releaser: Arc<dyn HandleReleaser> = Arc::clone(self) as Arc<dyn HandleReleaser>;
        HostHandle::adopt(raw.get(), kind, releaser)
    }
}

impl HandleTable<GlobalRef> {
    /// Promote `object` to a global reference and adopt it.
    ///
    /// # Errors
    ///
    /// - [`BridgeError::InvalidHandle`] if `object` is a null reference
    /// - [`BridgeError::HostUnavailable`] if the VM refuses the global reference
    pub fn pin(self: &Arc<Self>, env: &JNIEnv, object: &JObject, kind: &'static str) -> Result<HostHandle> {
        let object = non_null(object, kind)?;
        let global = env
            .new_global_ref(object)
            .map_err(|err| BridgeError::HostUnavailable(err.to_string()))?;
        self.adopt(global, kind)
    }
}

/// `new_global_ref` accepts null and returns a null global; reject it here.
pub(crate) fn non_null<'a, 'local>(object: &'a JObject<'local>, kind: &'static str) -> Result<&'a JObject<'local>> {
    if object.is_null() {
        return Err(BridgeError::InvalidHandle(format!("null {kind} reference")));
    }
    Ok(object)
}

impl<T> Default for HandleTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + Sync> HandleReleaser for HandleTable<T> {
    fn release(&self, raw: RawHandle) {
        // Drop the global ref after the lock is released.
        let removed = self.entries().remove(&raw.get());
        match removed {
            Some(_) => trace!(handle = %raw, "Unpinned host object"),
            None => warn!(handle = %raw, "Release of unknown host handle"),
        }
    }
}

impl<T> fmt::Debug for HandleTable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandleTable")
            .field("pinned", &self.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique_and_non_zero() {
        let table = HandleTable::<&'static str>::new();
        let a = table.insert("service").unwrap();
        let b = table.insert("activity").unwrap();

        assert_ne!(a, b);
        assert!(a.get() > 0);
        assert_eq!(table.get(a).unwrap(), "service");
        assert_eq!(table.get(b).unwrap(), "activity");
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_dropping_handle_unpins_entry() {
        let table = Arc::new(HandleTable::<String>::new());
        let handle = table.adopt("service".to_string(), "service").unwrap();
        let raw = handle.raw();
        assert_eq!(table.get(raw).unwrap(), "service");

        drop(handle);

        assert!(table.is_empty());
        assert!(matches!(table.get(raw), Err(BridgeError::InvalidHandle(_))));
    }

    #[test]
    fn test_stale_release_is_harmless() {
        let table = HandleTable::<u8>::new();
        let raw = table.insert(1).unwrap();

        table.release(raw);
        table.release(raw);

        assert!(table.is_empty());
    }

    #[test]
    fn test_null_object_is_rejected() {
        let null = JObject::null();

        for kind in ["activity", "service"] {
            let Err(BridgeError::InvalidHandle(message)) = non_null(&null, kind) else {
                panic!("null {kind} accepted");
            };
            assert!(message.contains(kind));
        }
    }
}
