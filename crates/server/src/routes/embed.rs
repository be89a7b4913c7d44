use crate::error::{ServerError, ServerResult};
use crate::state::ServerState;
use axum::extract::State;
use axum::Json;
use embedsearch::{BatchItem, IndexResult, PipelineError};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

const EMBED_FAILURE: &str = "Error embedding and storing files";

/// Request to embed files from the server's filesystem
#[derive(Debug, Default, Deserialize)]
pub struct EmbedRequest {
    #[serde(default)]
    pub files: Vec<String>,
}

/// Outcome for one requested file
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct EmbedFileResult {
    pub file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding_dim: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EmbedFileResult {
    fn indexed(file: String, result: &IndexResult) -> Self {
        Self {
            file,
            key: Some(result.key.clone()),
            embedding_dim: Some(result.embedding.len()),
            error: None,
        }
    }

    fn failed(file: String, error: String) -> Self {
        Self {
            file,
            key: None,
            embedding_dim: None,
            error: Some(error),
        }
    }
}

/// Batch response: one entry per requested file, in request order
#[derive(Debug, Serialize, Deserialize)]
pub struct EmbedResponse {
    pub results: Vec<EmbedFileResult>,
    pub indexed: usize,
    pub failed: usize,
}

/// Read one file; the identifier is its basename.
async fn read_file(file: &str) -> Result<BatchItem, String> {
    let path = Path::new(file);
    let id = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| format!("File {file} has no file name"))?;

    match tokio::fs::read_to_string(path).await {
        Ok(content) => Ok(BatchItem::new(id, content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(format!("File {file} does not exist"))
        }
        Err(e) => Err(format!("Failed to read {file}: {e}")),
    }
}

/// POST /embed
///
/// Files are read concurrently and indexed as one batch. Each file succeeds or fails on
/// its own; the request only fails outright when nothing was indexed because the
/// pipeline itself is down.
pub async fn embed_files(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<EmbedRequest>,
) -> ServerResult<Json<EmbedResponse>> {
    if request.files.is_empty() {
        return Err(ServerError::BadRequest("No files provided".to_string()));
    }

    let reads = join_all(request.files.iter().map(|file| read_file(file))).await;

    let mut results: Vec<Option<EmbedFileResult>> = Vec::with_capacity(reads.len());
    let mut batch = Vec::new();
    let mut positions = Vec::new();
    for (pos, (file, read)) in request.files.iter().zip(reads).enumerate() {
        match read {
            Ok(item) => {
                positions.push(pos);
                batch.push(item);
                results.push(None);
            }
            Err(error) => {
                tracing::warn!(file = %file, error = %error, "skipping unreadable file");
                results.push(Some(EmbedFileResult::failed(file.clone(), error)));
            }
        }
    }

    let mut operational: Option<PipelineError> = None;
    let mut operational_failures = 0;
    for (pos, outcome) in positions.into_iter().zip(state.engine.index_batch(batch).await) {
        let file = request.files[pos].clone();
        results[pos] = Some(match outcome.result {
            Ok(result) => EmbedFileResult::indexed(file, &result),
            Err(err) => {
                let message = err.to_string();
                if !err.is_caller_error() {
                    operational_failures += 1;
                    operational.get_or_insert(err);
                }
                EmbedFileResult::failed(file, message)
            }
        });
    }

    let results: Vec<EmbedFileResult> = results.into_iter().flatten().collect();
    let indexed = results.iter().filter(|r| r.error.is_none()).count();
    let failed = results.len() - indexed;

    if operational_failures == results.len() {
        if let Some(err) = operational {
            return Err(ServerError::pipeline(err, EMBED_FAILURE));
        }
    }

    tracing::info!(indexed, failed, "embed request finished");
    Ok(Json(EmbedResponse {
        results,
        indexed,
        failed,
    }))
}

/// Request to index one inline document
#[derive(Debug, Deserialize)]
pub struct IndexRequest {
    pub id: String,
    /// JSON text, or a JSON value that is serialized before indexing
    pub content: Value,
}

/// POST /index
pub async fn index_document(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<IndexRequest>,
) -> ServerResult<Json<IndexResult>> {
    let content = match request.content {
        Value::String(text) => text,
        other => other.to_string(),
    };

    let result = state
        .engine
        .index(&content, &request.id)
        .await
        .map_err(|e| ServerError::pipeline(e, "Error embedding and storing document"))?;

    Ok(Json(result))
}
