use std::io;
use thiserror::Error;

/// Errors surfaced by the embedding providers.
#[derive(Debug, Error)]
pub enum SemanticError {
    /// Configuration is inconsistent (e.g., remote mode without an API key).
    #[error("invalid semantic config: {0}")]
    InvalidConfig(String),
    /// The remote embedding service failed: transport error, non-2xx status
    /// (bad credential, rate limit, server error) or an unreadable body.
    #[error("remote embedding failed: {0}")]
    Remote(String),
    /// The local embedding source is not configured, missing, or holds no vectors.
    #[error("local embedding unavailable: {0}")]
    Unavailable(String),
    /// A strategy-specific entrypoint was called while another strategy is active.
    #[error("embedding strategy mismatch: {0}")]
    StrategyMismatch(String),
    /// Low-level IO failures while touching the filesystem.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl Clone for SemanticError {
    fn clone(&self) -> Self {
        match self {
            SemanticError::InvalidConfig(s) => SemanticError::InvalidConfig(s.clone()),
            SemanticError::Remote(s) => SemanticError::Remote(s.clone()),
            SemanticError::Unavailable(s) => SemanticError::Unavailable(s.clone()),
            SemanticError::StrategyMismatch(s) => SemanticError::StrategyMismatch(s.clone()),
            SemanticError::Io(e) => SemanticError::Unavailable(format!("io error: {e}")),
        }
    }
}

impl SemanticError {
    /// True when the failure comes from the local/file-backed side (or from asking the wrong
    /// strategy for a local vector), as opposed to the remote service.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            SemanticError::Unavailable(_) | SemanticError::StrategyMismatch(_) | SemanticError::Io(_)
        )
    }
}
