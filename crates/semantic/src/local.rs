use std::io;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::api::parse_embeddings_from_value;
use crate::{Embedding, SemanticError};

/// File-backed strategy: returns the first vector of a precomputed embedding record.
///
/// The file uses the same shape the remote service answers with, e.g.
/// `{"data":[{"embedding":[0.1, ...]}, ...]}`. The input text is ignored.
#[derive(Debug, Clone)]
pub struct LocalEmbedder {
    path: Option<PathBuf>,
    model_name: String,
}

impl LocalEmbedder {
    pub fn new(path: Option<PathBuf>, model_name: impl Into<String>) -> Self {
        Self {
            path,
            model_name: model_name.into(),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Read the configured file and return its first vector.
    pub async fn load(&self) -> Result<Embedding, SemanticError> {
        let path = self.path.as_deref().ok_or_else(|| {
            SemanticError::Unavailable("local embedding path is not configured".into())
        })?;

        let raw = match tokio::fs::read(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(SemanticError::Unavailable(format!(
                    "local embedding file {} does not exist",
                    path.display()
                )))
            }
            Err(e) => return Err(SemanticError::Io(e)),
        };

        let value: Value = serde_json::from_slice(&raw).map_err(|e| {
            SemanticError::Unavailable(format!(
                "local embedding file {} is not valid JSON: {e}",
                path.display()
            ))
        })?;

        let vector = parse_embeddings_from_value(value)
            .map_err(|e| {
                SemanticError::Unavailable(format!("{}: {e}", path.display()))
            })?
            .into_iter()
            .next()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                SemanticError::Unavailable(format!(
                    "local embedding file {} holds no vectors",
                    path.display()
                ))
            })?;

        tracing::debug!(path = %path.display(), dim = vector.len(), "loaded local embedding");
        Ok(Embedding::new(vector, self.model_name.clone()))
    }
}
