//! Embedding indexing and vector retrieval.
//!
//! Documents go in as JSON text plus an identifier. The [`Indexer`] embeds the raw text,
//! merges the vector into the parsed object under the reserved `embedding` field and
//! upserts it under `embedding::<id>`. The [`Retriever`] embeds a query, asks the store's
//! vector index for the nearest neighbours, fetches each hit and hands back the documents
//! without their embeddings, best match first.
//!
//! [`SearchEngine`] wires both to one [`StoreHandle`] and one embedding strategy chosen at
//! startup.
//!
//! ```no_run
//! use embedsearch::{PipelineConfig, SearchEngine};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let cfg = PipelineConfig::from_file("embedsearch.yaml")?.with_env_api_key();
//! let engine = SearchEngine::open(cfg).await?;
//!
//! engine.index(r#"{"title":"Vector databases"}"#, "doc1").await?;
//! for hit in engine.search(Some("what is a vector db?"), false).await? {
//!     println!("{:.3} {}", hit.score, hit.content);
//! }
//! engine.shutdown().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
mod engine;
mod error;
mod indexer;
mod key;
mod retriever;
mod store;

pub use config::{ConfigLoadError, PipelineConfig, SearchSection, API_KEY_ENV};
pub use engine::{EngineHealth, SearchEngine};
pub use error::PipelineError;
pub use indexer::{BatchItem, BatchItemOutcome, IndexResult, Indexer};
pub use key::{normalize_hit_key, DocumentKey, EMBEDDING_KEY_PREFIX};
pub use retriever::{
    strip_reserved_field, ResolvedResult, Retriever, SearchConfig, DEFAULT_CANDIDATE_COUNT,
};
pub use store::StoreHandle;

pub use index::{
    BackendConfig, CompressionCodec, CompressionConfig, DocumentStore, InMemoryBackend,
    IndexBackend, IndexError, StoreConfig, VectorHit, VectorQuery,
};
pub use semantic::{
    Embedder, Embedding, EmbeddingProvider, SemanticConfig, SemanticError, StubEmbedder,
};
