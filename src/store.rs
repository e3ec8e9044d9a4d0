//! Snapshot store
//!
//! Keeps the latest [`WatchSnapshot`] per (pipeline, source) for the current
//! export window. Subscribers upsert from any thread; the export scheduler
//! takes the whole window with [`SnapshotStore::drain`], which reads and
//! clears under one lock so no upsert can fall between the two.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::types::{SnapshotKey, WatchSnapshot};

/// Contents of one export window
pub type StoreSnapshot = HashMap<SnapshotKey, WatchSnapshot>;

/// Last-write-wins accumulator shared by the subscriber and the scheduler
#[derive(Debug, Default)]
pub struct SnapshotStore {
    entries: Mutex<StoreSnapshot>,
}

impl SnapshotStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a snapshot, replacing any previous one for the same key
    ///
    /// Returns the replaced snapshot. File lists are never merged.
    pub fn upsert(&self, snapshot: WatchSnapshot) -> Option<WatchSnapshot> {
        let key = snapshot.key();
        self.entries.lock().insert(key, snapshot)
    }

    /// Take every entry and leave the store empty
    pub fn drain(&self) -> StoreSnapshot {
        std::mem::take(&mut *self.entries.lock())
    }

    /// Remove every entry. No-op on an empty store.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Current snapshot for a key
    pub fn get(&self, key: &SnapshotKey) -> Option<WatchSnapshot> {
        self.entries.lock().get(key).cloned()
    }

    /// Number of (pipeline, source) pairs in the current window
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Check if the current window is empty
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FileRecord;
    use chrono::Utc;
    use std::sync::Arc;

    fn snapshot(pipeline: &str, source: &str, files: &[&str]) -> WatchSnapshot {
        WatchSnapshot {
            pipeline_name: pipeline.to_string(),
            source_name: source.to_string(),
            files: files
                .iter()
                .map(|name| FileRecord {
                    file_name: name.to_string(),
                    file_size: 10,
                    ack_offset: 10,
                    last_modify_time: Utc::now(),
                    ignore_older: false,
                })
                .collect(),
            total_file_count: files.len() as u64,
            inactive_fd_count: 0,
        }
    }

    #[test]
    fn test_upsert_overwrites() {
        let store = SnapshotStore::new();
        assert!(store.upsert(snapshot("p1", "s1", &["a.log", "b.log"])).is_none());

        let replaced = store.upsert(snapshot("p1", "s1", &["c.log"])).unwrap();
        assert_eq!(replaced.files.len(), 2);

        let current = store.get(&SnapshotKey::new("p1", "s1")).unwrap();
        assert_eq!(current.files.len(), 1);
        assert_eq!(current.files[0].file_name, "c.log");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_distinct_keys() {
        let store = SnapshotStore::new();
        store.upsert(snapshot("p1", "s1", &[]));
        store.upsert(snapshot("p1", "s2", &[]));
        store.upsert(snapshot("p2", "s1", &[]));
        // Would collide under naive "-" concatenation
        store.upsert(snapshot("a-b", "c", &[]));
        store.upsert(snapshot("a", "b-c", &[]));

        assert_eq!(store.len(), 5);
    }

    #[test]
    fn test_drain_empties_store() {
        let store = SnapshotStore::new();
        store.upsert(snapshot("p1", "s1", &["a.log"]));
        store.upsert(snapshot("p2", "s1", &["b.log"]));

        let window = store.drain();
        assert_eq!(window.len(), 2);
        assert!(store.is_empty());
        assert!(store.drain().is_empty());
    }

    #[test]
    fn test_clear_idempotent() {
        let store = SnapshotStore::new();
        store.clear();
        assert!(store.is_empty());

        store.upsert(snapshot("p1", "s1", &[]));
        store.clear();
        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn test_concurrent_upserts() {
        let store = Arc::new(SnapshotStore::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for j in 0..100 {
                        store.upsert(snapshot(&format!("p{}", i), &format!("s{}", j % 10), &[]));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.len(), 80);
    }
}
