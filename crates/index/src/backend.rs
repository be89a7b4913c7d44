use crate::IndexError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::RwLock;

/// Raw key-value storage underneath a [`DocumentStore`](crate::DocumentStore).
///
/// Backends only move opaque bytes; encoding, compression and the vector index live above.
pub trait IndexBackend: Send + Sync {
    /// Insert or overwrite the value stored under `key`.
    fn put(&self, key: &str, value: &[u8]) -> Result<(), IndexError>;
    /// Fetch the value stored under `key`.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, IndexError>;
    /// Remove `key`. Removing an absent key is not an error.
    fn delete(&self, key: &str) -> Result<(), IndexError>;
    /// Visit every stored entry in key order.
    fn scan(
        &self,
        visitor: &mut dyn FnMut(&str, &[u8]) -> Result<(), IndexError>,
    ) -> Result<(), IndexError>;
    /// Number of stored entries.
    fn count(&self) -> Result<usize, IndexError> {
        let mut total = 0usize;
        self.scan(&mut |_, _| {
            total += 1;
            Ok(())
        })?;
        Ok(total)
    }
    /// Make pending writes durable.
    fn flush(&self) -> Result<(), IndexError> {
        Ok(())
    }
}

/// Which storage backend a document store runs on.
///
/// ```
/// use index::BackendConfig;
///
/// let ephemeral = BackendConfig::in_memory();
/// let on_disk = BackendConfig::redb("/var/lib/embedsearch/documents.redb");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendConfig {
    /// Single-file Redb database at `path`, created if missing.
    ///
    /// Needs the `backend-redb` feature (on by default).
    Redb { path: String },
    /// Process-local map. Everything is lost on shutdown.
    #[default]
    InMemory,
}

impl BackendConfig {
    pub fn in_memory() -> Self {
        BackendConfig::InMemory
    }

    pub fn redb<P: Into<String>>(path: P) -> Self {
        BackendConfig::Redb { path: path.into() }
    }

    /// Short label for logs and health output.
    pub fn kind(&self) -> &'static str {
        match self {
            BackendConfig::Redb { .. } => "redb",
            BackendConfig::InMemory => "in_memory",
        }
    }

    /// Open the configured backend.
    pub fn build(&self) -> Result<Box<dyn IndexBackend>, IndexError> {
        match self {
            BackendConfig::InMemory => Ok(Box::new(InMemoryBackend::new())),
            BackendConfig::Redb { path } => {
                #[cfg(feature = "backend-redb")]
                {
                    Ok(Box::new(RedbBackend::open(path)?))
                }
                #[cfg(not(feature = "backend-redb"))]
                {
                    let _ = path;
                    Err(IndexError::backend("redb backend disabled at compile time"))
                }
            }
        }
    }
}

/// In-memory backend: a `BTreeMap` behind a `RwLock`, so scans come out in key order
/// like they do from Redb.
pub struct InMemoryBackend {
    records: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
        }
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl IndexBackend for InMemoryBackend {
    fn put(&self, key: &str, value: &[u8]) -> Result<(), IndexError> {
        self.records
            .write()
            .map_err(|_| IndexError::backend("poisoned lock"))?
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, IndexError> {
        let guard = self
            .records
            .read()
            .map_err(|_| IndexError::backend("poisoned lock"))?;
        Ok(guard.get(key).cloned())
    }

    fn delete(&self, key: &str) -> Result<(), IndexError> {
        self.records
            .write()
            .map_err(|_| IndexError::backend("poisoned lock"))?
            .remove(key);
        Ok(())
    }

    fn scan(
        &self,
        visitor: &mut dyn FnMut(&str, &[u8]) -> Result<(), IndexError>,
    ) -> Result<(), IndexError> {
        let guard = self
            .records
            .read()
            .map_err(|_| IndexError::backend("poisoned lock"))?;
        for (key, value) in guard.iter() {
            visitor(key, value)?;
        }
        Ok(())
    }

    fn count(&self) -> Result<usize, IndexError> {
        Ok(self
            .records
            .read()
            .map_err(|_| IndexError::backend("poisoned lock"))?
            .len())
    }
}

#[cfg(feature = "backend-redb")]
pub mod redb;

#[cfg(feature = "backend-redb")]
pub use redb::RedbBackend;
