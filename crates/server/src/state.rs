use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use embedsearch::SearchEngine;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct ServerState {
    /// Server configuration
    pub config: Arc<ServerConfig>,

    /// Indexing and search context, opened once at startup
    pub engine: Arc<SearchEngine>,
}

impl ServerState {
    /// Open the search engine described by `config.pipeline`.
    pub async fn new(config: ServerConfig) -> ServerResult<Self> {
        let engine = SearchEngine::open(config.pipeline.clone())
            .await
            .map_err(|e| ServerError::Config(e.to_string()))?;
        Ok(Self::with_engine(config, Arc::new(engine)))
    }

    /// Wrap an engine that was opened elsewhere.
    pub fn with_engine(config: ServerConfig, engine: Arc<SearchEngine>) -> Self {
        Self {
            config: Arc::new(config),
            engine,
        }
    }
}

/// Version and uptime, reported by the liveness probe
#[derive(Debug, serde::Serialize)]
pub struct ServerMetadata {
    pub version: String,
    /// RFC 3339 time the server started
    pub started_at: String,
    pub uptime_seconds: u64,
}
