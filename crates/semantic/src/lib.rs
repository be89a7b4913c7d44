//! Embedding providers for embedsearch.
//!
//! This crate turns text into fixed-length vectors. The model itself is somebody
//! else's problem: we either ask a remote service or read a vector someone already
//! computed.
//!
//! Strategies:
//!
//! - **remote** - POST the text to an OpenAI-compatible `/v1/embeddings` endpoint.
//! - **local** - Read a precomputed embedding record from disk and return its first vector.
//! - **stub** - Deterministic hash-seeded vectors. Offline development and tests only.
//!
//! Exactly one strategy is active per process. [`EmbeddingProvider::from_config`] picks it
//! once; callers get an [`EmbeddingProvider`] value and never branch on the mode again.
//! There is no fallback between strategies and no retry inside this crate.
//!
//! ## Quick example
//!
//! ```no_run
//! use semantic::{Embedder, EmbeddingProvider, SemanticConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), semantic::SemanticError> {
//!     let cfg = SemanticConfig::remote("sk-...");
//!     let provider = EmbeddingProvider::from_config(&cfg)?;
//!     let embedding = provider.embed("What is a vector index?").await?;
//!     println!("{} dims", embedding.embedding_dim);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod types;

mod api;
mod local;
mod stub;

pub use crate::api::RemoteEmbedder;
pub use crate::config::SemanticConfig;
pub use crate::error::SemanticError;
pub use crate::local::LocalEmbedder;
pub use crate::stub::StubEmbedder;
pub use crate::types::Embedding;

use async_trait::async_trait;

/// Anything that can turn text into an [`Embedding`].
///
/// The indexing and retrieval pipeline only sees this trait, so tests can hand it a fake.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Short strategy label for logs and health output.
    fn strategy(&self) -> &'static str;

    /// Model identifier attached to produced embeddings.
    fn model_name(&self) -> &str;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Embedding, SemanticError>;

    /// Return the precomputed local query vector.
    ///
    /// Only the file-backed strategy has one. Everyone else fails fast.
    async fn local_query_embedding(&self) -> Result<Embedding, SemanticError> {
        Err(SemanticError::StrategyMismatch(format!(
            "local query embedding requested but the '{}' strategy is active",
            self.strategy()
        )))
    }
}

/// The embedding strategy selected for this process.
#[derive(Debug, Clone)]
pub enum EmbeddingProvider {
    Remote(RemoteEmbedder),
    Local(LocalEmbedder),
    Stub(StubEmbedder),
}

impl EmbeddingProvider {
    /// Validate `cfg` and build the matching strategy.
    pub fn from_config(cfg: &SemanticConfig) -> Result<Self, SemanticError> {
        cfg.validate()?;
        let provider = match cfg.mode.as_str() {
            "remote" => EmbeddingProvider::Remote(RemoteEmbedder::new(cfg)?),
            "local" => EmbeddingProvider::Local(LocalEmbedder::new(
                cfg.local_embedding_path.clone(),
                cfg.model_name.clone(),
            )),
            "stub" => EmbeddingProvider::Stub(
                StubEmbedder::new(cfg.stub_dimension).with_model_name(cfg.model_name.clone()),
            ),
            other => {
                return Err(SemanticError::InvalidConfig(format!(
                    "unknown embedding mode '{other}'"
                )))
            }
        };
        tracing::info!(
            strategy = provider.strategy(),
            model = provider.model_name(),
            "embedding provider ready"
        );
        Ok(provider)
    }
}

#[async_trait]
impl Embedder for EmbeddingProvider {
    fn strategy(&self) -> &'static str {
        match self {
            EmbeddingProvider::Remote(_) => "remote",
            EmbeddingProvider::Local(_) => "local",
            EmbeddingProvider::Stub(_) => "stub",
        }
    }

    fn model_name(&self) -> &str {
        match self {
            EmbeddingProvider::Remote(inner) => inner.model_name(),
            EmbeddingProvider::Local(inner) => inner.model_name(),
            EmbeddingProvider::Stub(inner) => inner.model_name(),
        }
    }

    async fn embed(&self, text: &str) -> Result<Embedding, SemanticError> {
        match self {
            EmbeddingProvider::Remote(inner) => inner.embed(text).await,
            // The file holds one query vector; it cannot stand in for arbitrary text.
            EmbeddingProvider::Local(_) => Err(SemanticError::StrategyMismatch(
                "the 'local' strategy only serves the precomputed query vector".into(),
            )),
            EmbeddingProvider::Stub(inner) => Ok(inner.embed(text)),
        }
    }

    async fn local_query_embedding(&self) -> Result<Embedding, SemanticError> {
        match self {
            EmbeddingProvider::Local(inner) => inner.load().await,
            other => Err(SemanticError::StrategyMismatch(format!(
                "local query embedding requested but the '{}' strategy is active",
                other.strategy()
            ))),
        }
    }
}
