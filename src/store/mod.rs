//! Record storage layer abstraction
//!
//! The service stores opaque file records under a two-level address: a
//! namespace (a named, isolated keyspace fixed at startup) and a file
//! identifier unique within that namespace. Backends implement the
//! [`RecordStore`] trait; higher layers never see which backend is in use.
//!
//! The central law is write-once: a (namespace, identifier) pair, once
//! created, is never overwritten, updated or deleted. The only permitted
//! mutation is the administrative redaction of `personal_info`.

pub mod memory_store;
pub mod sqlite_store;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fileid::IdStrategy;

/// The unit of storage: one uploaded file plus its metadata envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Which generation strategy produced the identifier.
    pub id_type: IdStrategy,
    /// Client-facing filename, restricted to the portable charset.
    pub file_name: String,
    /// Creation time in nanoseconds, captured before request validation.
    pub timestamp: u64,
    /// Opaque binary content.
    pub payload: Vec<u8>,
    /// Record-scoped fragment of the access-control object; combined with the
    /// route-level permission object when this file is accessed.
    pub permission_partial: String,
    /// Pseudonymous identity annotation from the authorization collaborator.
    /// Cleared, and only cleared, by the admin redaction operation.
    pub personal_info: String,
}

/// Storage layer failures. Client-facing messages where a route surfaces them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Invalid database name '{0}'.")]
    UnknownNamespace(String),
    #[error("Invalid filename '{0}'.")]
    UnknownId(String),
    #[error("Can not overwrite {0}")]
    Collision(String),
    #[error("Storage backend failure: {0}")]
    Backend(String),
}

/// Trait defining the record storage interface.
///
/// Implementations must make `create` atomic with respect to the existence
/// check: two concurrent creates of the same identifier must yield exactly
/// one success and one [`StoreError::Collision`]. Separate exists-then-write
/// round trips are not an acceptable implementation.
pub trait RecordStore: Send + Sync {
    /// Identifiers currently stored in a namespace, unordered.
    fn list(&self, namespace: &str) -> Result<Vec<String>, StoreError>;

    /// Whether an identifier exists in a namespace.
    fn exists(&self, namespace: &str, fileid: &str) -> Result<bool, StoreError>;

    /// Atomically store a new record. Fails with [`StoreError::Collision`]
    /// if the identifier is already taken in that namespace.
    fn create(&self, namespace: &str, fileid: &str, record: FileRecord) -> Result<(), StoreError>;

    /// Fetch a stored record.
    fn get(&self, namespace: &str, fileid: &str) -> Result<FileRecord, StoreError>;

    /// Clear the `personal_info` field of a record, touching nothing else.
    /// Idempotent; a missing record is a silent no-op.
    fn clear_personal_info(&self, namespace: &str, fileid: &str) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn sample_record(name: &str) -> FileRecord {
        FileRecord {
            id_type: IdStrategy::Custom,
            file_name: name.to_string(),
            timestamp: 1_700_000_000_000_000_000,
            payload: b"sample payload".to_vec(),
            permission_partial: "{}".to_string(),
            personal_info: "Erkki Esimerkki".to_string(),
        }
    }

    #[test]
    fn test_store_error_messages() {
        assert_eq!(
            StoreError::UnknownNamespace("nope".to_string()).to_string(),
            "Invalid database name 'nope'."
        );
        assert_eq!(
            StoreError::UnknownId("abc".to_string()).to_string(),
            "Invalid filename 'abc'."
        );
        assert_eq!(
            StoreError::Collision("abcde".to_string()).to_string(),
            "Can not overwrite abcde"
        );
    }

    #[test]
    fn test_record_roundtrips_through_serde() {
        let record = sample_record("roundtrip.bin");
        let json = serde_json::to_string(&record).unwrap();
        let back: FileRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
