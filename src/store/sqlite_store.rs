//! SQLite implementation of the RecordStore trait
//!
//! One table holds every keyspace; namespace isolation comes from the
//! keyspace column, and the write-once law from the (keyspace, fileid)
//! primary key. The INSERT either takes the key or fails with a constraint
//! violation, which is the atomic conditional write the trait requires.

use crate::fileid::IdStrategy;
use crate::store::{FileRecord, RecordStore, StoreError};
use log::{info, warn};
use rusqlite::{params, Connection, ErrorCode};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;

/// SQLite-backed record store.
pub struct SqliteRecordStore {
    namespaces: BTreeMap<String, u32>,
    conn: Mutex<Connection>,
}

impl SqliteRecordStore {
    /// Open (or create) the database file and ensure the schema exists.
    pub fn open(
        db_path: impl AsRef<Path>,
        namespaces: BTreeMap<String, u32>,
    ) -> Result<Self, StoreError> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StoreError::Backend(e.to_string()))?;
            }
        }
        let conn = Connection::open(db_path).map_err(|e| StoreError::Backend(e.to_string()))?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS file_records (
                keyspace INTEGER NOT NULL,
                fileid TEXT NOT NULL,
                id_type TEXT NOT NULL,
                file_name TEXT NOT NULL,
                timestamp INTEGER NOT NULL,
                payload BLOB NOT NULL,
                permission_partial TEXT NOT NULL,
                personal_info TEXT NOT NULL,
                PRIMARY KEY (keyspace, fileid)
            )",
            [],
        )
        .map_err(|e| StoreError::Backend(e.to_string()))?;
        info!("Opened record database at {}", db_path.display());
        Ok(Self {
            namespaces,
            conn: Mutex::new(conn),
        })
    }

    fn keyspace(&self, namespace: &str) -> Result<u32, StoreError> {
        self.namespaces
            .get(namespace)
            .copied()
            .ok_or_else(|| StoreError::UnknownNamespace(namespace.to_string()))
    }
}

fn backend_err(e: rusqlite::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

impl RecordStore for SqliteRecordStore {
    fn list(&self, namespace: &str) -> Result<Vec<String>, StoreError> {
        let keyspace = self.keyspace(namespace)?;
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT fileid FROM file_records WHERE keyspace = ?1")
            .map_err(backend_err)?;
        let rows = stmt
            .query_map(params![keyspace], |row| row.get::<_, String>(0))
            .map_err(backend_err)?;

        let mut fileids = Vec::new();
        for row in rows {
            fileids.push(row.map_err(backend_err)?);
        }
        Ok(fileids)
    }

    fn exists(&self, namespace: &str, fileid: &str) -> Result<bool, StoreError> {
        let keyspace = self.keyspace(namespace)?;
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM file_records WHERE keyspace = ?1 AND fileid = ?2",
                params![keyspace, fileid],
                |row| row.get(0),
            )
            .map_err(backend_err)?;
        Ok(count > 0)
    }

    fn create(&self, namespace: &str, fileid: &str, record: FileRecord) -> Result<(), StoreError> {
        let keyspace = self.keyspace(namespace)?;
        let conn = self.conn.lock().unwrap();
        // The primary key turns the INSERT into a conditional write; no
        // separate existence check is made.
        let result = conn.execute(
            "INSERT INTO file_records
                (keyspace, fileid, id_type, file_name, timestamp, payload,
                 permission_partial, personal_info)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                keyspace,
                fileid,
                record.id_type.as_str(),
                record.file_name,
                record.timestamp as i64,
                record.payload,
                record.permission_partial,
                record.personal_info,
            ],
        );
        match result {
            Ok(_) => {
                info!("Stored record {} in namespace {}", fileid, namespace);
                Ok(())
            }
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == ErrorCode::ConstraintViolation =>
            {
                warn!("Rejected overwrite of {} in namespace {}", fileid, namespace);
                Err(StoreError::Collision(fileid.to_string()))
            }
            Err(e) => Err(backend_err(e)),
        }
    }

    fn get(&self, namespace: &str, fileid: &str) -> Result<FileRecord, StoreError> {
        let keyspace = self.keyspace(namespace)?;
        let conn = self.conn.lock().unwrap();
        let (id_type, file_name, timestamp, payload, permission_partial, personal_info) = conn
            .query_row(
                "SELECT id_type, file_name, timestamp, payload, permission_partial, personal_info
                 FROM file_records WHERE keyspace = ?1 AND fileid = ?2",
                params![keyspace, fileid],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, Vec<u8>>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                    ))
                },
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::UnknownId(fileid.to_string()),
                other => backend_err(other),
            })?;
        // An unparseable id_type column is data corruption and must surface,
        // not be coerced to some strategy.
        let id_type: IdStrategy = id_type.parse().map_err(|_| {
            StoreError::Backend(format!(
                "record {} has unrecognized id_type '{}'",
                fileid, id_type
            ))
        })?;
        Ok(FileRecord {
            id_type,
            file_name,
            timestamp: timestamp as u64,
            payload,
            permission_partial,
            personal_info,
        })
    }

    fn clear_personal_info(&self, namespace: &str, fileid: &str) -> Result<(), StoreError> {
        let keyspace = self.keyspace(namespace)?;
        let conn = self.conn.lock().unwrap();
        // Zero rows affected means the record does not exist; the admin
        // surface treats that as a silent no-op.
        conn.execute(
            "UPDATE file_records SET personal_info = '' WHERE keyspace = ?1 AND fileid = ?2",
            params![keyspace, fileid],
        )
        .map_err(backend_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::sample_record;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn test_store(dir: &TempDir) -> SqliteRecordStore {
        let mut namespaces = BTreeMap::new();
        namespaces.insert("alpha".to_string(), 0);
        namespaces.insert("beta".to_string(), 1);
        SqliteRecordStore::open(dir.path().join("records.sqlite"), namespaces).unwrap()
    }

    #[test]
    fn test_create_get_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);
        let record = sample_record("hello.txt");

        store.create("alpha", "file-1", record.clone()).unwrap();
        assert!(store.exists("alpha", "file-1").unwrap());
        assert_eq!(store.get("alpha", "file-1").unwrap(), record);
    }

    #[test]
    fn test_insert_conflict_maps_to_collision() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);

        store.create("alpha", "file-1", sample_record("a.txt")).unwrap();
        assert_eq!(
            store.create("alpha", "file-1", sample_record("b.txt")),
            Err(StoreError::Collision("file-1".to_string()))
        );
        assert_eq!(store.get("alpha", "file-1").unwrap().file_name, "a.txt");
    }

    #[test]
    fn test_keyspaces_are_isolated() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);

        store.create("alpha", "shared", sample_record("a.txt")).unwrap();
        store.create("beta", "shared", sample_record("b.txt")).unwrap();

        assert_eq!(store.list("alpha").unwrap(), vec!["shared".to_string()]);
        assert_eq!(store.get("beta", "shared").unwrap().file_name, "b.txt");
    }

    #[test]
    fn test_unknown_namespace_and_id() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);

        assert_eq!(
            store.list("gamma"),
            Err(StoreError::UnknownNamespace("gamma".to_string()))
        );
        assert_eq!(
            store.get("alpha", "missing"),
            Err(StoreError::UnknownId("missing".to_string()))
        );
    }

    #[test]
    fn test_redaction_clears_only_personal_info() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);
        store.create("alpha", "file-1", sample_record("a.txt")).unwrap();

        store.clear_personal_info("alpha", "file-1").unwrap();
        store.clear_personal_info("alpha", "file-1").unwrap();
        store.clear_personal_info("alpha", "never-stored").unwrap();

        let record = store.get("alpha", "file-1").unwrap();
        assert_eq!(record.personal_info, "");
        assert_eq!(record.payload, b"sample payload".to_vec());
        assert_eq!(record.permission_partial, "{}");
    }

    #[test]
    fn test_corrupted_id_type_surfaces_as_backend_error() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);
        store.create("alpha", "file-1", sample_record("a.txt")).unwrap();

        // Corrupt the column through a second connection to the same file.
        let conn = Connection::open(dir.path().join("records.sqlite")).unwrap();
        conn.execute(
            "UPDATE file_records SET id_type = 'glacier' WHERE fileid = 'file-1'",
            [],
        )
        .unwrap();

        assert!(matches!(
            store.get("alpha", "file-1"),
            Err(StoreError::Backend(_))
        ));
    }

    #[test]
    fn test_concurrent_creates_yield_one_success() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(test_store(&dir));
        let mut handles = Vec::new();

        for i in 0..4 {
            let store = Arc::clone(&store);
            handles.push(std::thread::spawn(move || {
                store.create("alpha", "contested", sample_record(&format!("f{}.txt", i)))
            }));
        }

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert_eq!(
            results
                .iter()
                .filter(|r| matches!(r, Err(StoreError::Collision(_))))
                .count(),
            3
        );
    }
}
