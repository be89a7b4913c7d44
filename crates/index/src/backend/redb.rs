//! Redb (Rust embedded database) backend for persistent document storage.
//!
//! One database file, one table keyed by document key. Every write is its own ACID
//! transaction, so a committed `put` survives a crash without an explicit flush.
//!
//! ```yaml
//! store:
//!   backend:
//!     kind: redb
//!     path: /var/lib/embedsearch/documents.redb
//! ```

use crate::{IndexBackend, IndexError};
use redb::{Database, ReadableTable, ReadableTableMetadata, TableDefinition};
use std::path::Path;
use std::sync::Arc;

const DOCUMENTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("documents");

/// Persistent backend. `Database` does its own locking, so the handle is shared freely.
pub struct RedbBackend {
    db: Arc<Database>,
}

impl RedbBackend {
    /// Open the database at `path`, creating the file and the table if needed.
    ///
    /// ```no_run
    /// use index::RedbBackend;
    ///
    /// let backend = RedbBackend::open("/tmp/documents.redb").unwrap();
    /// ```
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, IndexError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                IndexError::backend(format!("cannot create {}: {e}", parent.display()))
            })?;
        }

        let db = Database::create(path).map_err(IndexError::backend)?;

        let write_txn = db.begin_write().map_err(IndexError::backend)?;
        {
            let _table = write_txn
                .open_table(DOCUMENTS_TABLE)
                .map_err(IndexError::backend)?;
        }
        write_txn.commit().map_err(IndexError::backend)?;

        log::debug!("opened redb document store at {}", path.display());
        Ok(Self { db: Arc::new(db) })
    }
}

impl IndexBackend for RedbBackend {
    fn put(&self, key: &str, value: &[u8]) -> Result<(), IndexError> {
        let write_txn = self.db.begin_write().map_err(IndexError::backend)?;
        {
            let mut table = write_txn
                .open_table(DOCUMENTS_TABLE)
                .map_err(IndexError::backend)?;
            table.insert(key, value).map_err(IndexError::backend)?;
        }
        write_txn.commit().map_err(IndexError::backend)?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, IndexError> {
        let read_txn = self.db.begin_read().map_err(IndexError::backend)?;
        let table = read_txn
            .open_table(DOCUMENTS_TABLE)
            .map_err(IndexError::backend)?;

        Ok(table
            .get(key)
            .map_err(IndexError::backend)?
            .map(|value| value.value().to_vec()))
    }

    fn delete(&self, key: &str) -> Result<(), IndexError> {
        let write_txn = self.db.begin_write().map_err(IndexError::backend)?;
        {
            let mut table = write_txn
                .open_table(DOCUMENTS_TABLE)
                .map_err(IndexError::backend)?;
            table.remove(key).map_err(IndexError::backend)?;
        }
        write_txn.commit().map_err(IndexError::backend)?;
        Ok(())
    }

    fn scan(
        &self,
        visitor: &mut dyn FnMut(&str, &[u8]) -> Result<(), IndexError>,
    ) -> Result<(), IndexError> {
        let read_txn = self.db.begin_read().map_err(IndexError::backend)?;
        let table = read_txn
            .open_table(DOCUMENTS_TABLE)
            .map_err(IndexError::backend)?;

        for item in table.iter().map_err(IndexError::backend)? {
            let (key, value) = item.map_err(IndexError::backend)?;
            visitor(key.value(), value.value())?;
        }
        Ok(())
    }

    fn count(&self) -> Result<usize, IndexError> {
        let read_txn = self.db.begin_read().map_err(IndexError::backend)?;
        let table = read_txn
            .open_table(DOCUMENTS_TABLE)
            .map_err(IndexError::backend)?;
        Ok(table.len().map_err(IndexError::backend)? as usize)
    }

    fn flush(&self) -> Result<(), IndexError> {
        // Commits are already durable.
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn redb_roundtrip_and_overwrite() {
        let dir = tempdir().unwrap();
        let backend = RedbBackend::open(dir.path().join("docs.redb")).unwrap();

        backend.put("embedding::doc1", b"first").unwrap();
        backend.put("embedding::doc1", b"second").unwrap();
        assert_eq!(
            backend.get("embedding::doc1").unwrap(),
            Some(b"second".to_vec())
        );
        assert_eq!(backend.get("embedding::missing").unwrap(), None);
        assert_eq!(backend.count().unwrap(), 1);
    }

    #[test]
    fn redb_delete() {
        let dir = tempdir().unwrap();
        let backend = RedbBackend::open(dir.path().join("docs.redb")).unwrap();

        backend.put("k", b"v").unwrap();
        backend.delete("k").unwrap();
        assert_eq!(backend.get("k").unwrap(), None);
        backend.delete("k").unwrap();
    }

    #[test]
    fn redb_scan_yields_keys_in_order() {
        let dir = tempdir().unwrap();
        let backend = RedbBackend::open(dir.path().join("docs.redb")).unwrap();

        backend.put("key2", b"value2").unwrap();
        backend.put("key1", b"value1").unwrap();

        let mut seen = Vec::new();
        backend
            .scan(&mut |key, value| {
                seen.push((key.to_string(), value.to_vec()));
                Ok(())
            })
            .unwrap();

        assert_eq!(
            seen,
            vec![
                ("key1".to_string(), b"value1".to_vec()),
                ("key2".to_string(), b"value2".to_vec()),
            ]
        );
    }

    #[test]
    fn redb_persists_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("docs.redb");
        {
            let backend = RedbBackend::open(&path).unwrap();
            backend.put("k", b"v").unwrap();
        }
        let backend = RedbBackend::open(&path).unwrap();
        assert_eq!(backend.get("k").unwrap(), Some(b"v".to_vec()));
    }
}
