//! Concurrent association from target identity to the most recently
//! requested URL.
//!
//! The map is the single source of truth for "is this still the URL we want
//! for this target": the worker re-reads it when a work item is picked up,
//! and the delivery path re-checks it before invoking the listener. Per-key
//! last-write-wins; no ordering guarantee across keys.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Shared `target -> url` table, cloneable across the caller context, the
/// worker, and delivery closures.
pub(crate) struct RequestMap<T> {
    inner: Arc<RwLock<HashMap<T, String>>>,
}

impl<T> Clone for RequestMap<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Eq + Hash> RequestMap<T> {
    pub(crate) fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Record `url` as the desired thumbnail for `target`, replacing any
    /// previous entry.
    pub(crate) fn set(&self, target: T, url: String) {
        self.write().insert(target, url);
    }

    pub(crate) fn get(&self, target: &T) -> Option<String> {
        self.read().get(target).cloned()
    }

    pub(crate) fn remove(&self, target: &T) {
        self.write().remove(target);
    }

    /// Remove the entry for `target` only if it still maps to `url`.
    ///
    /// This is the delivery-time staleness check: comparison and removal
    /// happen under one write lock, so a concurrent re-enqueue cannot slip in
    /// between them. Returns true if the entry matched and was removed.
    pub(crate) fn remove_if_current(&self, target: &T, url: &str) -> bool {
        let mut map = self.write();
        match map.get(target) {
            Some(current) if current.as_str() == url => {
                map.remove(target);
                true
            }
            _ => false,
        }
    }

    pub(crate) fn clear(&self) {
        self.write().clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.read().len()
    }

    // A panic in caller-supplied code must not wedge the map.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<T, String>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<T, String>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_round_trips() {
        let map: RequestMap<u32> = RequestMap::new();
        map.set(1, "http://img/1.jpg".into());
        assert_eq!(map.get(&1), Some("http://img/1.jpg".into()));
        assert_eq!(map.get(&2), None);
    }

    #[test]
    fn set_overwrites_per_key() {
        let map: RequestMap<u32> = RequestMap::new();
        map.set(1, "http://img/old.jpg".into());
        map.set(1, "http://img/new.jpg".into());
        assert_eq!(map.get(&1), Some("http://img/new.jpg".into()));
        assert_eq!(map.len(), 1, "overwriting must not grow the map");
    }

    #[test]
    fn remove_and_clear() {
        let map: RequestMap<u32> = RequestMap::new();
        map.set(1, "a".into());
        map.set(2, "b".into());
        map.remove(&1);
        assert_eq!(map.get(&1), None);
        assert_eq!(map.len(), 1);
        map.clear();
        assert_eq!(map.len(), 0);
    }

    #[test]
    fn remove_if_current_matches() {
        let map: RequestMap<u32> = RequestMap::new();
        map.set(1, "http://img/a.jpg".into());
        assert!(map.remove_if_current(&1, "http://img/a.jpg"));
        assert_eq!(map.get(&1), None);
    }

    #[test]
    fn remove_if_current_rejects_superseded_url_and_keeps_entry() {
        let map: RequestMap<u32> = RequestMap::new();
        map.set(1, "http://img/new.jpg".into());
        assert!(
            !map.remove_if_current(&1, "http://img/old.jpg"),
            "a stale URL must not match"
        );
        assert_eq!(
            map.get(&1),
            Some("http://img/new.jpg".into()),
            "the newer entry must survive a stale removal attempt"
        );
    }

    #[test]
    fn remove_if_current_on_absent_entry_is_false() {
        let map: RequestMap<u32> = RequestMap::new();
        assert!(!map.remove_if_current(&1, "http://img/a.jpg"));
    }

    #[test]
    fn concurrent_writers_on_independent_keys() {
        let map: RequestMap<u32> = RequestMap::new();
        let mut handles = Vec::new();
        for key in 0..8u32 {
            let map = map.clone();
            handles.push(std::thread::spawn(move || {
                for i in 0..100 {
                    map.set(key, format!("http://img/{key}/{i}.jpg"));
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(map.len(), 8);
        for key in 0..8u32 {
            assert_eq!(map.get(&key), Some(format!("http://img/{key}/99.jpg")));
        }
    }
}
