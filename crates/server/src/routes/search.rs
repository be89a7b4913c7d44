use crate::error::{ServerError, ServerResult};
use crate::state::ServerState;
use axum::extract::State;
use axum::Json;
use embedsearch::ResolvedResult;
use serde::Deserialize;
use std::sync::Arc;

/// Search request body
#[derive(Debug, Default, Deserialize)]
pub struct SearchRequest {
    /// Query text; ignored when `use_local` is set
    #[serde(default)]
    pub q: Option<String>,

    /// Search with the precomputed local query vector
    #[serde(default)]
    pub use_local: bool,
}

/// POST /search
///
/// Responds with the matching documents, best first, without their embeddings.
pub async fn search_documents(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<SearchRequest>,
) -> ServerResult<Json<Vec<ResolvedResult>>> {
    let results = state
        .engine
        .search(request.q.as_deref(), request.use_local)
        .await
        .map_err(|e| ServerError::pipeline(e, "Error searching documents"))?;

    Ok(Json(results))
}
