use index::IndexError;
use semantic::SemanticError;
use thiserror::Error;

/// Everything the indexing and retrieval pipeline can fail with.
///
/// `MalformedContent` and `EmptyQuery` are the caller's fault and are reported as such.
/// The rest are operational and surface after the first attempt; nothing here retries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    /// The remote embedding service failed.
    #[error("embedding failed: {0}")]
    EmbeddingFailure(String),
    /// Local embedding mode is misconfigured or its source is missing.
    #[error("embedding unavailable: {0}")]
    EmbeddingUnavailable(String),
    /// No query text and no local-embedding flag.
    #[error("no search term provided")]
    EmptyQuery,
    /// Content could not be parsed into a JSON object.
    #[error("malformed content for '{id}': {reason}")]
    MalformedContent { id: String, reason: String },
    /// The document store could not be opened or written.
    #[error("document store unavailable: {0}")]
    StoreUnavailable(String),
    /// The similarity query itself failed.
    #[error("vector search failed: {0}")]
    SearchFailure(String),
    /// A search hit whose document could not be fetched. Only ever logged per hit.
    #[error("document '{0}' is missing")]
    DocumentMissing(String),
    /// The pipeline configuration was rejected at open.
    #[error("invalid pipeline config: {0}")]
    Config(String),
}

impl PipelineError {
    pub fn malformed(id: impl Into<String>, reason: impl ToString) -> Self {
        PipelineError::MalformedContent {
            id: id.into(),
            reason: reason.to_string(),
        }
    }

    /// Bad input rather than a broken dependency.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            PipelineError::MalformedContent { .. } | PipelineError::EmptyQuery
        )
    }

    /// Stable snake_case label for logs and API error codes.
    pub fn code(&self) -> &'static str {
        match self {
            PipelineError::EmbeddingFailure(_) => "embedding_failure",
            PipelineError::EmbeddingUnavailable(_) => "embedding_unavailable",
            PipelineError::EmptyQuery => "empty_query",
            PipelineError::MalformedContent { .. } => "malformed_content",
            PipelineError::StoreUnavailable(_) => "store_unavailable",
            PipelineError::SearchFailure(_) => "search_failure",
            PipelineError::DocumentMissing(_) => "document_missing",
            PipelineError::Config(_) => "invalid_config",
        }
    }

    /// Classify a failed write. A vector that does not fit the index is the embedding's
    /// problem; everything else means the store let us down.
    pub(crate) fn from_store_write(err: IndexError) -> Self {
        match err {
            IndexError::DimensionMismatch { .. } | IndexError::InvalidVector(_) => {
                PipelineError::EmbeddingFailure(err.to_string())
            }
            other => PipelineError::StoreUnavailable(other.to_string()),
        }
    }

    /// Every failure of the similarity query is a search failure, including an unreachable store.
    pub(crate) fn from_search(err: IndexError) -> Self {
        PipelineError::SearchFailure(err.to_string())
    }
}

impl From<SemanticError> for PipelineError {
    fn from(err: SemanticError) -> Self {
        match err {
            SemanticError::InvalidConfig(msg) => PipelineError::Config(msg),
            err if err.is_unavailable() => PipelineError::EmbeddingUnavailable(err.to_string()),
            other => PipelineError::EmbeddingFailure(other.to_string()),
        }
    }
}
