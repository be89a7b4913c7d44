use std::sync::Arc;

use futures::stream::{self, StreamExt};
use semantic::Embedder;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::key::DocumentKey;
use crate::store::StoreHandle;
use crate::PipelineError;

/// Upper bound on documents embedded at the same time within one batch.
const BATCH_CONCURRENCY: usize = 8;

/// Outcome of indexing one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexResult {
    /// Store key the document was written under.
    pub key: String,
    pub embedding: Vec<f32>,
}

/// One document of a batch: caller identifier plus raw JSON text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchItem {
    pub id: String,
    pub content: String,
}

impl BatchItem {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
        }
    }
}

/// Per-document result of [`Indexer::index_batch`].
#[derive(Debug, Clone)]
pub struct BatchItemOutcome {
    pub id: String,
    pub result: Result<IndexResult, PipelineError>,
}

/// Embeds documents and writes them to the store.
///
/// Stored documents are the parsed JSON object with the embedding merged in under the
/// reserved vector field. A field of that name in the input is overwritten.
#[derive(Clone)]
pub struct Indexer {
    provider: Arc<dyn Embedder>,
    store: StoreHandle,
    vector_field: String,
}

impl Indexer {
    pub fn new(provider: Arc<dyn Embedder>, store: StoreHandle, vector_field: impl Into<String>) -> Self {
        Self {
            provider,
            store,
            vector_field: vector_field.into(),
        }
    }

    /// Parse, embed and upsert `content` under `embedding::<id>`.
    ///
    /// The embedding is computed over the raw text. Nothing is written unless every step
    /// succeeds.
    pub async fn index(&self, content: &str, id: &str) -> Result<IndexResult, PipelineError> {
        let result = self.index_inner(content, id).await;
        match &result {
            Ok(indexed) => tracing::info!(
                id,
                key = %indexed.key,
                dim = indexed.embedding.len(),
                "indexed document"
            ),
            Err(err) if err.is_caller_error() => {
                tracing::warn!(id, code = err.code(), error = %err, "rejected document")
            }
            Err(err) => {
                tracing::error!(id, code = err.code(), error = %err, "failed to index document")
            }
        }
        result
    }

    async fn index_inner(&self, content: &str, id: &str) -> Result<IndexResult, PipelineError> {
        if id.is_empty() {
            return Err(PipelineError::malformed(id, "identifier must not be empty"));
        }
        let mut fields = parse_content(content, id)?;

        let embedding = self.provider.embed(content).await?;

        let key = DocumentKey::for_id(id);
        fields.insert(self.vector_field.clone(), Value::from(embedding.vector.clone()));

        self.store
            .upsert(key.as_str().to_string(), Value::Object(fields))
            .await
            .map_err(PipelineError::from_store_write)?;

        Ok(IndexResult {
            key: key.into_string(),
            embedding: embedding.into_vector(),
        })
    }

    /// Index several documents concurrently.
    ///
    /// Each document succeeds or fails on its own; one failure never rolls back or hides
    /// another's write. Outcomes come back in input order.
    pub async fn index_batch(&self, items: Vec<BatchItem>) -> Vec<BatchItemOutcome> {
        let mut outcomes: Vec<(usize, BatchItemOutcome)> =
            stream::iter(items.into_iter().enumerate().map(|(idx, item)| {
                let indexer = self.clone();
                async move {
                    let result = indexer.index(&item.content, &item.id).await;
                    (idx, BatchItemOutcome { id: item.id, result })
                }
            }))
            .buffer_unordered(BATCH_CONCURRENCY)
            .collect()
            .await;

        outcomes.sort_by_key(|(idx, _)| *idx);

        let failed = outcomes.iter().filter(|(_, o)| o.result.is_err()).count();
        tracing::info!(
            total = outcomes.len(),
            failed,
            "batch indexing finished"
        );

        outcomes.into_iter().map(|(_, outcome)| outcome).collect()
    }
}

/// Parse raw content into the JSON object that will be stored.
fn parse_content(content: &str, id: &str) -> Result<Map<String, Value>, PipelineError> {
    match serde_json::from_str::<Value>(content) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(other) => Err(PipelineError::malformed(
            id,
            format!("expected a JSON object, got {}", json_kind(&other)),
        )),
        Err(e) => Err(PipelineError::malformed(id, e)),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
