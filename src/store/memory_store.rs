//! In-memory implementation of the RecordStore trait
//!
//! Used by tests and available as a configurable backend for ephemeral
//! deployments. One mutex guards all keyspaces, so the check-then-insert in
//! `create` is atomic by construction.

use crate::store::{FileRecord, RecordStore, StoreError};
use log::info;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

/// In-memory record store: keyspace index -> fileid -> record.
pub struct MemoryRecordStore {
    namespaces: BTreeMap<String, u32>,
    keyspaces: Mutex<HashMap<u32, HashMap<String, FileRecord>>>,
}

impl MemoryRecordStore {
    /// Create a store over a fixed namespace-to-keyspace mapping.
    pub fn new(namespaces: BTreeMap<String, u32>) -> Self {
        Self {
            namespaces,
            keyspaces: Mutex::new(HashMap::new()),
        }
    }

    /// Total number of records across all keyspaces.
    pub fn record_count(&self) -> usize {
        let keyspaces = self.keyspaces.lock().unwrap();
        keyspaces.values().map(|ks| ks.len()).sum()
    }

    /// Clear all data from the store (useful for test cleanup).
    pub fn clear(&self) {
        let mut keyspaces = self.keyspaces.lock().unwrap();
        keyspaces.clear();
    }

    fn keyspace(&self, namespace: &str) -> Result<u32, StoreError> {
        self.namespaces
            .get(namespace)
            .copied()
            .ok_or_else(|| StoreError::UnknownNamespace(namespace.to_string()))
    }
}

impl RecordStore for MemoryRecordStore {
    fn list(&self, namespace: &str) -> Result<Vec<String>, StoreError> {
        let keyspace = self.keyspace(namespace)?;
        let keyspaces = self.keyspaces.lock().unwrap();
        Ok(keyspaces
            .get(&keyspace)
            .map(|ks| ks.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn exists(&self, namespace: &str, fileid: &str) -> Result<bool, StoreError> {
        let keyspace = self.keyspace(namespace)?;
        let keyspaces = self.keyspaces.lock().unwrap();
        Ok(keyspaces
            .get(&keyspace)
            .map(|ks| ks.contains_key(fileid))
            .unwrap_or(false))
    }

    fn create(&self, namespace: &str, fileid: &str, record: FileRecord) -> Result<(), StoreError> {
        let keyspace = self.keyspace(namespace)?;
        // Single lock across check and insert keeps write-once atomic.
        let mut keyspaces = self.keyspaces.lock().unwrap();
        let records = keyspaces.entry(keyspace).or_default();
        if records.contains_key(fileid) {
            return Err(StoreError::Collision(fileid.to_string()));
        }
        records.insert(fileid.to_string(), record);
        info!("Stored record {} in namespace {}", fileid, namespace);
        Ok(())
    }

    fn get(&self, namespace: &str, fileid: &str) -> Result<FileRecord, StoreError> {
        let keyspace = self.keyspace(namespace)?;
        let keyspaces = self.keyspaces.lock().unwrap();
        keyspaces
            .get(&keyspace)
            .and_then(|ks| ks.get(fileid))
            .cloned()
            .ok_or_else(|| StoreError::UnknownId(fileid.to_string()))
    }

    fn clear_personal_info(&self, namespace: &str, fileid: &str) -> Result<(), StoreError> {
        let keyspace = self.keyspace(namespace)?;
        let mut keyspaces = self.keyspaces.lock().unwrap();
        if let Some(record) = keyspaces.get_mut(&keyspace).and_then(|ks| ks.get_mut(fileid)) {
            record.personal_info.clear();
            info!("Cleared personal info for {} in namespace {}", fileid, namespace);
        }
        // Missing record is a deliberate no-op on the admin surface.
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::sample_record;
    use std::sync::Arc;

    fn test_store() -> MemoryRecordStore {
        let mut namespaces = BTreeMap::new();
        namespaces.insert("alpha".to_string(), 0);
        namespaces.insert("beta".to_string(), 1);
        MemoryRecordStore::new(namespaces)
    }

    #[test]
    fn test_create_and_get() {
        let store = test_store();
        let record = sample_record("hello.txt");

        store.create("alpha", "file-1", record.clone()).unwrap();
        assert!(store.exists("alpha", "file-1").unwrap());
        assert_eq!(store.get("alpha", "file-1").unwrap(), record);
        assert_eq!(store.record_count(), 1);
    }

    #[test]
    fn test_write_once_rejects_second_create() {
        let store = test_store();
        let first = sample_record("first.txt");
        let second = sample_record("second.txt");

        store.create("alpha", "file-1", first.clone()).unwrap();
        assert_eq!(
            store.create("alpha", "file-1", second),
            Err(StoreError::Collision("file-1".to_string()))
        );
        // The original record is untouched.
        assert_eq!(store.get("alpha", "file-1").unwrap(), first);
    }

    #[test]
    fn test_namespace_isolation() {
        let store = test_store();
        store.create("alpha", "shared-id", sample_record("a.txt")).unwrap();

        // Same identifier is free in the other namespace.
        store.create("beta", "shared-id", sample_record("b.txt")).unwrap();

        assert_eq!(store.list("alpha").unwrap(), vec!["shared-id".to_string()]);
        assert_eq!(store.get("alpha", "shared-id").unwrap().file_name, "a.txt");
        assert_eq!(store.get("beta", "shared-id").unwrap().file_name, "b.txt");
    }

    #[test]
    fn test_unknown_namespace() {
        let store = test_store();
        assert_eq!(
            store.list("gamma"),
            Err(StoreError::UnknownNamespace("gamma".to_string()))
        );
        assert_eq!(
            store.create("gamma", "file-1", sample_record("a.txt")),
            Err(StoreError::UnknownNamespace("gamma".to_string()))
        );
    }

    #[test]
    fn test_get_unknown_id() {
        let store = test_store();
        assert_eq!(
            store.get("alpha", "missing"),
            Err(StoreError::UnknownId("missing".to_string()))
        );
    }

    #[test]
    fn test_clear_personal_info_is_idempotent() {
        let store = test_store();
        store.create("alpha", "file-1", sample_record("a.txt")).unwrap();

        store.clear_personal_info("alpha", "file-1").unwrap();
        let record = store.get("alpha", "file-1").unwrap();
        assert_eq!(record.personal_info, "");
        // Only personal_info was touched.
        assert_eq!(record.file_name, "a.txt");
        assert_eq!(record.permission_partial, "{}");

        // Second redaction is a no-op, not an error.
        store.clear_personal_info("alpha", "file-1").unwrap();
        assert_eq!(store.get("alpha", "file-1").unwrap().personal_info, "");
    }

    #[test]
    fn test_clear_personal_info_missing_record_is_noop() {
        let store = test_store();
        store.clear_personal_info("alpha", "never-stored").unwrap();
    }

    #[test]
    fn test_concurrent_creates_yield_one_success() {
        let store = Arc::new(test_store());
        let mut handles = Vec::new();

        for i in 0..8 {
            let store = Arc::clone(&store);
            handles.push(std::thread::spawn(move || {
                store.create("alpha", "contested-id", sample_record(&format!("f{}.txt", i)))
            }));
        }

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let successes = results.iter().filter(|r| r.is_ok()).count();
        let collisions = results
            .iter()
            .filter(|r| matches!(r, Err(StoreError::Collision(_))))
            .count();

        assert_eq!(successes, 1);
        assert_eq!(collisions, 7);
    }
}
