use std::sync::Arc;

use index::DocumentStore;
use semantic::{Embedder, EmbeddingProvider};
use serde::{Deserialize, Serialize};

use crate::config::PipelineConfig;
use crate::indexer::{BatchItem, BatchItemOutcome, IndexResult, Indexer};
use crate::retriever::{ResolvedResult, Retriever, SearchConfig};
use crate::store::StoreHandle;
use crate::PipelineError;

/// Snapshot returned by [`SearchEngine::health`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineHealth {
    pub store_ok: bool,
    /// `None` when the store could not be counted.
    pub documents: Option<usize>,
    pub vectors: usize,
    pub dimension: Option<usize>,
    pub backend: String,
    pub strategy: String,
    pub model: String,
}

/// Long-lived context that owns the store and the embedding strategy.
///
/// Build it once at startup with [`SearchEngine::open`], share it (it is cheap to wrap in an
/// `Arc`), and call [`SearchEngine::shutdown`] before exit.
pub struct SearchEngine {
    provider: Arc<dyn Embedder>,
    store: StoreHandle,
    indexer: Indexer,
    retriever: Retriever,
}

impl SearchEngine {
    /// Validate `cfg`, pick the embedding strategy and open the store.
    ///
    /// The store is opened here, not on first use; a store that cannot be opened fails
    /// startup with [`PipelineError::StoreUnavailable`].
    pub async fn open(cfg: PipelineConfig) -> Result<Self, PipelineError> {
        cfg.validate()
            .map_err(|e| PipelineError::Config(e.to_string()))?;

        let provider = EmbeddingProvider::from_config(&cfg.semantic)?;
        let search = cfg.search_config();
        let store_cfg = cfg.store;
        let backend = store_cfg.backend.kind();

        let store = tokio::task::spawn_blocking(move || DocumentStore::open(store_cfg))
            .await
            .map_err(|e| PipelineError::StoreUnavailable(format!("store open task failed: {e}")))?
            .map_err(|e| {
                tracing::error!(backend, error = %e, "failed to open document store");
                PipelineError::StoreUnavailable(e.to_string())
            })?;

        tracing::info!(
            backend,
            strategy = provider.strategy(),
            vectors = store.vector_count(),
            "search engine ready"
        );

        Ok(Self::from_parts(Arc::new(provider), store, search))
    }

    /// Assemble an engine from an already-built provider and store.
    pub fn from_parts(
        provider: Arc<dyn Embedder>,
        store: DocumentStore,
        search: SearchConfig,
    ) -> Self {
        let store = StoreHandle::new(store);
        let indexer = Indexer::new(
            Arc::clone(&provider),
            store.clone(),
            search.vector_field.clone(),
        );
        let retriever = Retriever::new(Arc::clone(&provider), store.clone(), search);
        Self {
            provider,
            store,
            indexer,
            retriever,
        }
    }

    pub fn indexer(&self) -> &Indexer {
        &self.indexer
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    pub fn store(&self) -> &StoreHandle {
        &self.store
    }

    pub fn provider(&self) -> &dyn Embedder {
        self.provider.as_ref()
    }

    pub async fn index(&self, content: &str, id: &str) -> Result<IndexResult, PipelineError> {
        self.indexer.index(content, id).await
    }

    pub async fn index_batch(&self, items: Vec<BatchItem>) -> Vec<BatchItemOutcome> {
        self.indexer.index_batch(items).await
    }

    pub async fn search(
        &self,
        query: Option<&str>,
        use_local: bool,
    ) -> Result<Vec<ResolvedResult>, PipelineError> {
        self.retriever.search(query, use_local).await
    }

    /// Check that the store answers and report what it holds.
    pub async fn health(&self) -> EngineHealth {
        let documents = match self.store.len().await {
            Ok(count) => Some(count),
            Err(e) => {
                tracing::warn!(error = %e, "store health check failed");
                None
            }
        };
        let store = self.store.store();
        EngineHealth {
            store_ok: documents.is_some(),
            documents,
            vectors: store.vector_count(),
            dimension: store.dimension(),
            backend: store.config().backend.kind().to_string(),
            strategy: self.provider.strategy().to_string(),
            model: self.provider.model_name().to_string(),
        }
    }

    /// Flush the store. The engine stays usable afterwards.
    pub async fn shutdown(&self) -> Result<(), PipelineError> {
        self.store.flush().await.map_err(|e| {
            tracing::error!(error = %e, "failed to flush document store");
            PipelineError::StoreUnavailable(e.to_string())
        })?;
        tracing::info!("search engine shut down");
        Ok(())
    }
}
