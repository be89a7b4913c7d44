use crate::state::{ServerMetadata, ServerState};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use std::time::SystemTime;

/// Global server start time for uptime calculation
static SERVER_START_TIME: once_cell::sync::Lazy<SystemTime> =
    once_cell::sync::Lazy::new(SystemTime::now);

/// Pin the uptime clock to now unless it is already running. Called at startup.
pub fn record_start_time() -> SystemTime {
    *once_cell::sync::Lazy::force(&SERVER_START_TIME)
}

fn uptime_seconds() -> u64 {
    SERVER_START_TIME
        .elapsed()
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Liveness response
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    timestamp: String,
    #[serde(flatten)]
    metadata: ServerMetadata,
}

/// Health check endpoint (liveness)
/// Returns 200 if server is running
pub async fn health_check() -> impl IntoResponse {
    let started_at = chrono::DateTime::<chrono::Utc>::from(record_start_time());

    Json(HealthResponse {
        status: "healthy",
        service: "embedsearch-server",
        timestamp: chrono::Utc::now().to_rfc3339(),
        metadata: ServerMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: started_at.to_rfc3339(),
            uptime_seconds: uptime_seconds(),
        },
    })
}

/// Readiness check endpoint
/// Returns 503 while the document store does not answer
pub async fn readiness_check(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    let engine = state.engine.health().await;
    let status = if engine.store_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let body = Json(json!({
        "status": if engine.store_ok { "ready" } else { "unavailable" },
        "service": "embedsearch-server",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": uptime_seconds(),
        "components": {
            "api": "ready",
            "store": if engine.store_ok { "ready" } else { "unavailable" },
            "embedding": engine.strategy.clone(),
        },
        "engine": engine,
    }));

    (status, body)
}
