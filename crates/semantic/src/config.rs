use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::SemanticError;

/// Default OpenAI-compatible embeddings endpoint.
pub const DEFAULT_API_URL: &str = "https://api.openai.com/v1/embeddings";

/// Default remote model identifier.
pub const DEFAULT_MODEL_NAME: &str = "text-embedding-ada-002";

/// Runtime configuration selecting the embedding strategy.
///
/// Exactly one strategy is active per process. It is read once at startup by
/// [`EmbeddingProvider::from_config`](crate::EmbeddingProvider::from_config); switching
/// requires building a new provider (in practice, a restart).
///
/// # Example
/// ```
/// use semantic::SemanticConfig;
///
/// let cfg = SemanticConfig {
///     mode: "remote".into(),
///     api_key: Some("sk-xxx".into()),
///     ..Default::default()
/// };
/// assert_eq!(cfg.model_name, "text-embedding-ada-002");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SemanticConfig {
    /// Strategy selector: `"remote"` (HTTP API), `"local"` (precomputed file) or `"stub"`
    /// (deterministic offline vectors).
    pub mode: String,
    /// Model identifier sent to the remote service and surfaced on every [`Embedding`](crate::Embedding).
    pub model_name: String,
    /// Remote embeddings endpoint.
    pub api_url: String,
    /// Bearer credential for the remote service.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Overall remote request timeout in seconds. `None` leaves the call unbounded.
    pub api_timeout_secs: Option<u64>,
    /// Location of the precomputed embedding file used by the local strategy.
    pub local_embedding_path: Option<PathBuf>,
    /// Vector length produced by the stub strategy.
    pub stub_dimension: usize,
}

impl Default for SemanticConfig {
    fn default() -> Self {
        Self {
            mode: "remote".into(),
            model_name: DEFAULT_MODEL_NAME.into(),
            api_url: DEFAULT_API_URL.into(),
            api_key: None,
            api_timeout_secs: None,
            local_embedding_path: None,
            stub_dimension: 1536,
        }
    }
}

impl SemanticConfig {
    pub fn remote(api_key: impl Into<String>) -> Self {
        Self {
            mode: "remote".into(),
            api_key: Some(api_key.into()),
            ..Default::default()
        }
    }

    pub fn local(path: impl Into<PathBuf>) -> Self {
        Self {
            mode: "local".into(),
            local_embedding_path: Some(path.into()),
            ..Default::default()
        }
    }

    pub fn stub(dimension: usize) -> Self {
        Self {
            mode: "stub".into(),
            model_name: "stub".into(),
            stub_dimension: dimension,
            ..Default::default()
        }
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    pub fn with_model_name(mut self, model: impl Into<String>) -> Self {
        self.model_name = model.into();
        self
    }

    pub fn api_timeout(&self) -> Option<Duration> {
        self.api_timeout_secs.map(Duration::from_secs)
    }

    /// Check the fields the selected mode depends on.
    pub fn validate(&self) -> Result<(), SemanticError> {
        match self.mode.as_str() {
            "remote" => {
                if self.api_url.trim().is_empty() {
                    return Err(SemanticError::InvalidConfig(
                        "api_url is required for remote mode".into(),
                    ));
                }
                if self.api_key.as_deref().map_or(true, |k| k.trim().is_empty()) {
                    return Err(SemanticError::InvalidConfig(
                        "api_key is required for remote mode".into(),
                    ));
                }
                Ok(())
            }
            // A missing path is reported per call as `Unavailable`, not at startup.
            "local" => Ok(()),
            "stub" => {
                if self.stub_dimension == 0 {
                    return Err(SemanticError::InvalidConfig(
                        "stub_dimension must be greater than zero".into(),
                    ));
                }
                Ok(())
            }
            other => Err(SemanticError::InvalidConfig(format!(
                "unknown embedding mode '{other}' (expected remote, local or stub)"
            ))),
        }
    }
}
