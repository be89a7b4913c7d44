use std::sync::Arc;

use futures::future::join_all;
use index::{VectorHit, VectorQuery, DEFAULT_COLLECTION, DEFAULT_INDEX_NAME, DEFAULT_VECTOR_FIELD};
use semantic::Embedder;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::key::{normalize_hit_key, DocumentKey};
use crate::store::StoreHandle;
use crate::PipelineError;

/// Default number of nearest neighbours requested per search.
pub const DEFAULT_CANDIDATE_COUNT: usize = 5;

/// Which vector index a search targets and how many candidates it asks for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub candidate_count: usize,
    pub index_name: String,
    pub collection: String,
    pub vector_field: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            candidate_count: DEFAULT_CANDIDATE_COUNT,
            index_name: DEFAULT_INDEX_NAME.to_string(),
            collection: DEFAULT_COLLECTION.to_string(),
            vector_field: DEFAULT_VECTOR_FIELD.to_string(),
        }
    }
}

impl SearchConfig {
    pub fn with_candidate_count(mut self, k: usize) -> Self {
        self.candidate_count = k;
        self
    }
}

/// A retrieved document with its embedding removed, and how close it was to the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedResult {
    pub content: Value,
    /// Cosine similarity to the query, higher is closer.
    pub score: f32,
}

/// Answers similarity queries against the indexed documents.
#[derive(Clone)]
pub struct Retriever {
    provider: Arc<dyn Embedder>,
    store: StoreHandle,
    config: SearchConfig,
}

impl Retriever {
    pub fn new(provider: Arc<dyn Embedder>, store: StoreHandle, config: SearchConfig) -> Self {
        Self {
            provider,
            store,
            config,
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Find the documents closest to `query`, best first.
    ///
    /// With `use_local` the query text is ignored and the precomputed local vector is used.
    /// Hits whose document cannot be fetched are dropped; the rest keep the index's order.
    pub async fn search(
        &self,
        query: Option<&str>,
        use_local: bool,
    ) -> Result<Vec<ResolvedResult>, PipelineError> {
        let query_label = query.unwrap_or_default();

        let vector = match self.query_vector(query, use_local).await {
            Ok(vector) => vector,
            Err(err) => {
                log_failure(&err, query_label, use_local);
                return Err(err);
            }
        };

        let request = VectorQuery::new(
            self.config.index_name.clone(),
            self.config.collection.clone(),
            self.config.vector_field.clone(),
            vector,
        )
        .with_num_candidates(self.config.candidate_count);

        let hits = match self.store.vector_search(request).await {
            Ok(hits) => hits,
            Err(e) => {
                let err = PipelineError::from_search(e);
                log_failure(&err, query_label, use_local);
                return Err(err);
            }
        };

        let resolved: Vec<ResolvedResult> = join_all(hits.iter().map(|hit| self.resolve(hit)))
            .await
            .into_iter()
            .flatten()
            .collect();

        tracing::debug!(
            query = query_label,
            use_local,
            hits = hits.len(),
            resolved = resolved.len(),
            "search finished"
        );
        Ok(resolved)
    }

    async fn query_vector(
        &self,
        query: Option<&str>,
        use_local: bool,
    ) -> Result<Vec<f32>, PipelineError> {
        if use_local {
            return Ok(self.provider.local_query_embedding().await?.into_vector());
        }

        match query {
            Some(text) if !text.trim().is_empty() => {
                Ok(self.provider.embed(text).await?.into_vector())
            }
            _ => Err(PipelineError::EmptyQuery),
        }
    }

    /// Fetch the document behind one hit. `None` means the hit is dropped.
    async fn resolve(&self, hit: &VectorHit) -> Option<ResolvedResult> {
        let id = normalize_hit_key(&hit.id);
        let key = DocumentKey::for_id(id);

        let missing = match self.store.get(key.as_str().to_string()).await {
            Ok(Some(mut content)) => {
                strip_reserved_field(&mut content, &self.config.vector_field);
                return Some(ResolvedResult {
                    content,
                    score: hit.score,
                });
            }
            Ok(None) => PipelineError::DocumentMissing(id.to_string()),
            Err(e) => PipelineError::DocumentMissing(format!("{id}: {e}")),
        };

        tracing::warn!(id, key = %key, error = %missing, "dropping unresolvable search hit");
        None
    }
}

fn log_failure(err: &PipelineError, query: &str, use_local: bool) {
    if err.is_caller_error() {
        tracing::warn!(query, use_local, code = err.code(), error = %err, "rejected search");
    } else {
        tracing::error!(query, use_local, code = err.code(), error = %err, "search failed");
    }
}

/// Remove `field` from `value` wherever it appears as an object key, at any depth.
pub fn strip_reserved_field(value: &mut Value, field: &str) {
    match value {
        Value::Object(map) => {
            map.remove(field);
            for nested in map.values_mut() {
                strip_reserved_field(nested, field);
            }
        }
        Value::Array(items) => {
            for item in items {
                strip_reserved_field(item, field);
            }
        }
        _ => {}
    }
}
