//! API route handlers
//!
//! - `health`: liveness and readiness
//! - `search`: similarity search
//! - `embed`: indexing files and inline documents

pub mod embed;
pub mod health;
pub mod search;

use crate::error::{ServerError, ServerResult};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

/// API version and base info (GET /)
pub async fn api_info() -> ServerResult<impl IntoResponse> {
    Ok(Json(json!({
        "name": "embedsearch",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": [
            "POST /search",
            "POST /embed",
            "POST /index",
            "GET /health",
            "GET /ready"
        ]
    })))
}

/// 404 Not Found handler
pub async fn not_found() -> ServerError {
    ServerError::NotFound
}
