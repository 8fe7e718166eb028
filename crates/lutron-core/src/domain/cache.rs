//! Concurrency-safe cache of the last known state of every gateway output.
//!
//! # Who touches the cache?
//!
//! Two execution contexts share one `DeviceCache`:
//!
//! - The listener task, which records a new level every time the gateway
//!   reports an `~OUTPUT,<id>,1,<level>` change.
//! - Any number of caller tasks, which read levels, describe the whole cache,
//!   or upsert devices explicitly.
//!
//! The map is guarded by a `std::sync::RwLock`.  Every method takes the lock
//! for the duration of a single map operation and never across an `.await`,
//! so a plain blocking lock is enough.
//!
//! # Ordering
//!
//! Entries are kept in a `BTreeMap`, so iteration (and therefore
//! [`DeviceCache::snapshot`] and the `D=&L=` batch description built from it)
//! is always in ascending device-id order.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::domain::device::{Device, DeviceId};

/// Mapping from device id to [`Device`], safe to share behind an `Arc`.
///
/// Invariant: at most one entry per id, and an entry always reflects the most
/// recent of (a) an observed change frame or (b) an explicit upsert.  Entries
/// are never removed.
#[derive(Debug, Default)]
pub struct DeviceCache {
    devices: RwLock<BTreeMap<DeviceId, Device>>,
}

impl DeviceCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites the entry for `device.id`.
    pub fn upsert(&self, device: Device) {
        self.write().insert(device.id, device);
    }

    /// Records a newly observed level for `id` and returns the stored entry.
    ///
    /// The existing `on_level` is preserved; a device seen for the first time
    /// gets `default_on_level`.  The read-modify-write happens under a single
    /// write lock so two concurrent recorders cannot lose each other's update.
    pub fn record_level(&self, id: DeviceId, level: f64, default_on_level: f64) -> Device {
        let mut devices = self.write();
        let on_level = devices.get(&id).map_or(default_on_level, |d| d.on_level);
        let device = Device::new(id, level, on_level);
        devices.insert(id, device);
        device
    }

    /// Returns a copy of the entry for `id`, if the device has been seen.
    pub fn get(&self, id: DeviceId) -> Option<Device> {
        self.read().get(&id).copied()
    }

    /// Returns `true` if the device has been seen.
    pub fn contains(&self, id: DeviceId) -> bool {
        self.read().contains_key(&id)
    }

    /// Returns a copy of every entry in ascending id order.
    pub fn snapshot(&self) -> Vec<Device> {
        self.read().values().copied().collect()
    }

    /// Number of devices seen so far.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Returns `true` when no device has been seen yet.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    // A panic while holding the lock cannot leave a half-written entry behind
    // (every write is a single `insert`), so a poisoned lock is still usable.
    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<DeviceId, Device>> {
        self.devices.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<DeviceId, Device>> {
        self.devices.write().unwrap_or_else(PoisonError::into_inner)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::device::DEFAULT_ON_LEVEL;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_new_cache_is_empty() {
        let cache = DeviceCache::new();
        assert!(cache.is_empty());
        assert_eq!(cache.len(), 0);
        assert!(cache.get(5).is_none());
    }

    #[test]
    fn test_upsert_then_get_returns_device() {
        // Arrange
        let cache = DeviceCache::new();

        // Act
        cache.upsert(Device::new(5, 40.0, 90.0));

        // Assert
        assert_eq!(cache.get(5), Some(Device::new(5, 40.0, 90.0)));
        assert!(cache.contains(5));
    }

    #[test]
    fn test_upsert_overwrites_existing_entry() {
        let cache = DeviceCache::new();
        cache.upsert(Device::new(5, 40.0, 90.0));
        cache.upsert(Device::new(5, 10.0, 20.0));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(5), Some(Device::new(5, 10.0, 20.0)));
    }

    #[test]
    fn test_record_level_uses_default_on_level_for_new_device() {
        // Arrange
        let cache = DeviceCache::new();

        // Act
        let stored = cache.record_level(9, 75.0, DEFAULT_ON_LEVEL);

        // Assert
        assert_eq!(stored, Device::new(9, 75.0, DEFAULT_ON_LEVEL));
        assert_eq!(cache.get(9), Some(stored));
    }

    #[test]
    fn test_record_level_preserves_existing_on_level() {
        // Arrange: an explicit upsert set a custom on-level
        let cache = DeviceCache::new();
        cache.upsert(Device::new(9, 0.0, 60.0));

        // Act: the gateway later reports a new level
        let stored = cache.record_level(9, 25.0, DEFAULT_ON_LEVEL);

        // Assert: the level changes but the on-level survives
        assert_eq!(stored.current_level, 25.0);
        assert_eq!(stored.on_level, 60.0);
    }

    #[test]
    fn test_snapshot_is_ordered_by_id() {
        let cache = DeviceCache::new();
        cache.upsert(Device::new(7, 30.0, 100.0));
        cache.upsert(Device::new(5, 100.0, 100.0));
        cache.upsert(Device::new(12, 0.0, 100.0));

        let ids: Vec<DeviceId> = cache.snapshot().iter().map(|d| d.id).collect();

        assert_eq!(ids, vec![5, 7, 12]);
    }

    #[test]
    fn test_concurrent_recorders_and_readers_do_not_lose_entries() {
        // Arrange: one writer per id range plus readers hammering the map
        let cache = Arc::new(DeviceCache::new());
        let mut handles = Vec::new();

        for worker in 0..4u32 {
            let cache = Arc::clone(&cache);
            handles.push(thread::spawn(move || {
                for i in 0..100u32 {
                    cache.record_level(worker * 100 + i, f64::from(i), DEFAULT_ON_LEVEL);
                }
            }));
        }
        for _ in 0..2 {
            let cache = Arc::clone(&cache);
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    let _ = cache.snapshot();
                }
            }));
        }

        // Act
        for handle in handles {
            handle.join().unwrap();
        }

        // Assert: every write landed exactly once
        assert_eq!(cache.len(), 400);
        assert_eq!(cache.get(399).map(|d| d.current_level), Some(99.0));
    }
}
