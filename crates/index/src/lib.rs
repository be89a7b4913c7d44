//! # embedsearch index
//!
//! A key-value document store with a vector similarity index on one field.
//!
//! Documents are arbitrary JSON values stored under string keys. When a document carries a
//! numeric array under the configured vector field (default `embedding`), that array is
//! also entered into an in-process vector index so the document can be found by
//! [`DocumentStore::vector_search`].
//!
//! ## Core Features
//!
//! - **Pluggable Backends**: storage goes through the [`IndexBackend`] trait. Out of the box:
//!   - an in-memory map for tests and throwaway runs,
//!   - a [Redb](https://docs.rs/redb) file for persistent storage (`backend-redb` feature, on by default).
//! - **Compact records**: documents are bincode-encoded and Zstd-compressed before they hit
//!   the backend (see [`CompressionConfig`]).
//! - **Vector search**: cosine similarity, exact for small collections and HNSW
//!   ([`ann`]) once the collection grows past [`AnnConfig::min_vectors_for_ann`].
//!
//! The vector index lives in memory. [`DocumentStore::open`] rebuilds it by scanning the
//! backend, so a Redb-backed store is searchable again right after a restart.
//!
//! ## Example
//!
//! ```
//! use index::{DocumentStore, StoreConfig, VectorQuery};
//! use serde_json::json;
//!
//! let store = DocumentStore::open(StoreConfig::default()).unwrap();
//! store
//!     .upsert("embedding::doc1", &json!({ "title": "A", "embedding": [1.0, 0.0] }))
//!     .unwrap();
//!
//! let hits = store
//!     .vector_search(&VectorQuery::new("embeddings-index", "documents", "embedding", vec![1.0, 0.0]))
//!     .unwrap();
//! assert_eq!(hits[0].id, "embedding::doc1");
//! ```

pub mod ann;
mod backend;
mod query;

use crate::ann::{AnnConfig, AnnError, AnnIndex};
use std::sync::RwLock;

mod body_serde {
    use serde::de::Error as DeError;
    use serde::ser::Error as SerError;
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    // bincode cannot encode `serde_json::Value` directly, so the body travels as JSON bytes.
    pub(super) fn serialize<S>(value: &Value, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let bytes = serde_json::to_vec(value).map_err(SerError::custom)?;
        serializer.serialize_bytes(&bytes)
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bytes = Vec::<u8>::deserialize(deserializer)?;
        serde_json::from_slice(&bytes).map_err(DeError::custom)
    }
}

#[cfg(feature = "backend-redb")]
pub use backend::RedbBackend;
pub use backend::{BackendConfig, InMemoryBackend, IndexBackend};
pub use query::{VectorHit, VectorQuery};

use bincode::config::standard;
use bincode::error::{DecodeError, EncodeError};
use bincode::serde::{decode_from_slice, encode_to_vec};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use zstd::{decode_all, encode_all};

/// Bump this value whenever the on-disk `StoredDocument` layout changes.
pub const STORE_SCHEMA_VERSION: u16 = 1;

pub const DEFAULT_INDEX_NAME: &str = "embeddings-index";
pub const DEFAULT_COLLECTION: &str = "documents";
pub const DEFAULT_VECTOR_FIELD: &str = "embedding";

/// What actually sits in the backend for each key.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct StoredDocument {
    #[serde(default = "default_schema_version")]
    pub schema_version: u16,
    pub key: String,
    #[serde(with = "body_serde")]
    pub body: Value,
}

impl StoredDocument {
    pub fn new(key: impl Into<String>, body: Value) -> Self {
        Self {
            schema_version: STORE_SCHEMA_VERSION,
            key: key.into(),
            body,
        }
    }
}

const fn default_schema_version() -> u16 {
    STORE_SCHEMA_VERSION
}

/// Compression codec options for stored documents.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionCodec {
    None,
    #[default]
    Zstd,
}

/// Compression behavior configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionConfig {
    pub codec: CompressionCodec,
    /// Zstd level, 1-22. Higher compresses better and runs slower.
    pub level: i32,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            codec: CompressionCodec::default(),
            level: 3,
        }
    }
}

impl CompressionConfig {
    pub fn new(codec: CompressionCodec, level: i32) -> Self {
        Self { codec, level }
    }

    pub fn with_codec(mut self, codec: CompressionCodec) -> Self {
        self.codec = codec;
        self
    }

    pub fn with_level(mut self, level: i32) -> Self {
        self.level = level;
        self
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, IndexError> {
        match self.codec {
            CompressionCodec::None => Ok(data.to_vec()),
            CompressionCodec::Zstd => Ok(encode_all(data, self.level)?),
        }
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, IndexError> {
        match self.codec {
            CompressionCodec::None => Ok(data.to_vec()),
            CompressionCodec::Zstd => Ok(decode_all(data)?),
        }
    }
}

/// Config for opening a [`DocumentStore`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: BackendConfig,
    pub compression: CompressionConfig,
    pub ann: AnnConfig,
    /// Name callers use to address the vector index.
    pub index_name: String,
    /// Collection the vector index covers.
    pub collection: String,
    /// Document field holding the vector.
    pub vector_field: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            compression: CompressionConfig::default(),
            ann: AnnConfig::default(),
            index_name: DEFAULT_INDEX_NAME.to_string(),
            collection: DEFAULT_COLLECTION.to_string(),
            vector_field: DEFAULT_VECTOR_FIELD.to_string(),
        }
    }
}

impl StoreConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_backend(mut self, backend: BackendConfig) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_compression(mut self, compression: CompressionConfig) -> Self {
        self.compression = compression;
        self
    }

    pub fn with_ann(mut self, ann: AnnConfig) -> Self {
        self.ann = ann;
        self
    }

    pub fn with_index_name(mut self, name: impl Into<String>) -> Self {
        self.index_name = name.into();
        self
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    pub fn with_vector_field(mut self, field: impl Into<String>) -> Self {
        self.vector_field = field.into();
        self
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum IndexError {
    #[error("Backend error: {0}")]
    Backend(String),
    #[error("Serialization encode error: {0}")]
    Encode(String),
    #[error("Serialization decode error: {0}")]
    Decode(String),
    #[error("Compression error: {0}")]
    Zstd(String),
    #[error("Vector dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
    #[error("Invalid vector: {0}")]
    InvalidVector(String),
    #[error("Unknown vector index: {0}")]
    UnknownIndex(String),
}

impl From<EncodeError> for IndexError {
    fn from(e: EncodeError) -> Self {
        IndexError::Encode(e.to_string())
    }
}

impl From<DecodeError> for IndexError {
    fn from(e: DecodeError) -> Self {
        IndexError::Decode(e.to_string())
    }
}

impl From<std::io::Error> for IndexError {
    fn from(e: std::io::Error) -> Self {
        IndexError::Zstd(e.to_string())
    }
}

impl From<AnnError> for IndexError {
    fn from(e: AnnError) -> Self {
        match e {
            AnnError::DimensionMismatch { expected, got } => {
                IndexError::DimensionMismatch { expected, got }
            }
            AnnError::EmptyVector => IndexError::InvalidVector(e.to_string()),
            AnnError::NotBuilt => IndexError::Backend(e.to_string()),
        }
    }
}

impl IndexError {
    pub fn backend<E: std::fmt::Display>(err: E) -> Self {
        Self::Backend(err.to_string())
    }
}

/// Document store with a vector index over one field.
pub struct DocumentStore {
    backend: Box<dyn IndexBackend>,
    cfg: StoreConfig,
    /// Held for writing across a backend put so the stored document and its vector agree.
    ann: RwLock<AnnIndex>,
}

impl DocumentStore {
    /// Open the configured backend and rebuild the vector index from what it holds.
    pub fn open(cfg: StoreConfig) -> Result<Self, IndexError> {
        let backend = cfg.backend.build()?;
        Self::with_backend(cfg, backend)
    }

    /// Open on a caller-supplied backend (custom storage, fault injection in tests).
    pub fn with_backend(
        cfg: StoreConfig,
        backend: Box<dyn IndexBackend>,
    ) -> Result<Self, IndexError> {
        let store = Self {
            ann: RwLock::new(AnnIndex::new(cfg.ann)),
            backend,
            cfg,
        };
        store.reload_vectors()?;
        Ok(store)
    }

    pub fn config(&self) -> &StoreConfig {
        &self.cfg
    }

    /// Store `document` under `key`, replacing whatever was there.
    ///
    /// If the document has a vector under the configured field it becomes searchable;
    /// if it has none, any vector previously stored under `key` is dropped. A vector whose
    /// dimension disagrees with the index is rejected before anything is written.
    pub fn upsert(&self, key: &str, document: &Value) -> Result<(), IndexError> {
        let vector = extract_vector(document, &self.cfg.vector_field)?;
        let payload = self.encode_document(&StoredDocument::new(key, document.clone()))?;

        let mut ann = self
            .ann
            .write()
            .map_err(|_| IndexError::backend("poisoned lock"))?;
        if let Some(vector) = vector.as_deref() {
            ann.check_dimension(vector)?;
        }

        self.backend.put(key, &payload)?;

        match vector {
            Some(vector) => ann.upsert(key.to_string(), vector)?,
            None => {
                ann.remove(key);
            }
        }
        Ok(())
    }

    /// Fetch the document stored under `key`.
    pub fn get(&self, key: &str) -> Result<Option<Value>, IndexError> {
        match self.backend.get(key)? {
            Some(data) => Ok(Some(self.decode_document(&data)?.body)),
            None => Ok(None),
        }
    }

    /// Remove `key` and its vector. Absent keys are fine.
    pub fn delete(&self, key: &str) -> Result<(), IndexError> {
        let mut ann = self
            .ann
            .write()
            .map_err(|_| IndexError::backend("poisoned lock"))?;
        self.backend.delete(key)?;
        ann.remove(key);
        Ok(())
    }

    /// Number of stored documents, with or without vectors.
    pub fn len(&self) -> Result<usize, IndexError> {
        self.backend.count()
    }

    pub fn is_empty(&self) -> Result<bool, IndexError> {
        Ok(self.len()? == 0)
    }

    /// Number of searchable vectors.
    pub fn vector_count(&self) -> usize {
        self.ann.read().map(|ann| ann.len()).unwrap_or(0)
    }

    /// Vector dimension fixed by the first stored vector, if any.
    pub fn dimension(&self) -> Option<usize> {
        self.ann.read().ok().and_then(|ann| ann.dimension())
    }

    /// Flush backend buffers if supported.
    pub fn flush(&self) -> Result<(), IndexError> {
        self.backend.flush()
    }

    /// Visit every stored document.
    pub fn scan(
        &self,
        visitor: &mut dyn FnMut(&StoredDocument) -> Result<(), IndexError>,
    ) -> Result<(), IndexError> {
        self.backend.scan(&mut |_, data| {
            let doc = self.decode_document(data)?;
            visitor(&doc)
        })
    }

    /// Repopulate the vector index from the backend.
    ///
    /// Records that cannot be decoded, or whose vector is unusable, are skipped with a warning
    /// instead of failing the whole open.
    fn reload_vectors(&self) -> Result<(), IndexError> {
        let mut fresh = AnnIndex::new(self.cfg.ann);
        let mut skipped = 0usize;

        self.backend.scan(&mut |key, data| {
            let doc = match self.decode_document(data) {
                Ok(doc) => doc,
                Err(e) => {
                    log::warn!("skipping undecodable record {key}: {e}");
                    skipped += 1;
                    return Ok(());
                }
            };
            let vector = match extract_vector(&doc.body, &self.cfg.vector_field) {
                Ok(Some(vector)) => vector,
                Ok(None) => return Ok(()),
                Err(e) => {
                    log::warn!("skipping record {key}: {e}");
                    skipped += 1;
                    return Ok(());
                }
            };
            if let Err(e) = fresh.upsert(key.to_string(), vector) {
                log::warn!("skipping vector for {key}: {e}");
                skipped += 1;
            }
            Ok(())
        })?;

        log::info!(
            "vector index '{}' loaded with {} vectors ({} records skipped)",
            self.cfg.index_name,
            fresh.len(),
            skipped
        );

        *self
            .ann
            .write()
            .map_err(|_| IndexError::backend("poisoned lock"))? = fresh;
        Ok(())
    }

    pub(crate) fn decode_document(&self, data: &[u8]) -> Result<StoredDocument, IndexError> {
        let decompressed = self.cfg.compression.decompress(data)?;
        let (doc, _) = decode_from_slice(&decompressed, standard())?;
        Ok(doc)
    }

    fn encode_document(&self, doc: &StoredDocument) -> Result<Vec<u8>, IndexError> {
        let encoded = encode_to_vec(doc, standard())?;
        self.cfg.compression.compress(&encoded)
    }
}

/// Pull the vector out of `document[field]`.
///
/// `Ok(None)` when the field is absent or the document is not an object; an error when the
/// field exists but is not an array of numbers.
fn extract_vector(document: &Value, field: &str) -> Result<Option<Vec<f32>>, IndexError> {
    let Some(raw) = document.as_object().and_then(|map| map.get(field)) else {
        return Ok(None);
    };
    let Value::Array(items) = raw else {
        return Err(IndexError::InvalidVector(format!(
            "field '{field}' must be an array of numbers"
        )));
    };
    items
        .iter()
        .map(|item| {
            item.as_f64().map(|f| f as f32).ok_or_else(|| {
                IndexError::InvalidVector(format!("field '{field}' holds a non-numeric entry"))
            })
        })
        .collect::<Result<Vec<f32>, _>>()
        .map(Some)
}
