//! Router-level tests for the HTTP API.
//!
//! Requests go through the full middleware stack with `tower::ServiceExt::oneshot`;
//! the engine runs the stub embedder against an in-memory store.

use std::io::Write;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use embedsearch::{
    DocumentStore, Embedder, Embedding, PipelineConfig, SearchConfig, SearchEngine,
    SemanticConfig, SemanticError, StoreConfig,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use server::{build_router, ServerConfig, ServerState};
use tower::ServiceExt;

/// Embedder whose remote service is always down.
struct DownEmbedder;

#[async_trait]
impl Embedder for DownEmbedder {
    fn strategy(&self) -> &'static str {
        "remote"
    }

    fn model_name(&self) -> &str {
        "down"
    }

    async fn embed(&self, _text: &str) -> Result<Embedding, SemanticError> {
        Err(SemanticError::Remote("HTTP error 503".into()))
    }
}

async fn stub_state() -> Arc<ServerState> {
    let config = ServerConfig {
        pipeline: PipelineConfig {
            semantic: SemanticConfig::stub(16),
            ..Default::default()
        },
        ..Default::default()
    };
    Arc::new(ServerState::new(config).await.unwrap())
}

fn down_state() -> Arc<ServerState> {
    let store = DocumentStore::open(StoreConfig::default()).unwrap();
    let engine = SearchEngine::from_parts(Arc::new(DownEmbedder), store, SearchConfig::default());
    Arc::new(ServerState::with_engine(
        ServerConfig::default(),
        Arc::new(engine),
    ))
}

async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn write_file(dir: &tempfile::TempDir, name: &str, content: &str) -> String {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    path.to_string_lossy().into_owned()
}

#[tokio::test]
async fn search_without_term_is_400() {
    let app = build_router(stub_state().await);
    let (status, body) = post_json(app, "/search", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "No search term provided");
}

#[tokio::test]
async fn search_failure_is_500_with_generic_message() {
    let app = build_router(down_state());
    let (status, body) = post_json(app, "/search", json!({ "q": "test" })).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["message"], "Error searching documents");
    assert_eq!(body["error"]["details"]["kind"], "embedding_failure");
}

#[tokio::test]
async fn local_search_with_stub_strategy_is_500() {
    let app = build_router(stub_state().await);
    let (status, body) = post_json(app, "/search", json!({ "use_local": true })).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["details"]["kind"], "embedding_unavailable");
}

#[tokio::test]
async fn index_then_search_returns_documents_without_embeddings() {
    let state = stub_state().await;

    let (status, body) = post_json(
        build_router(state.clone()),
        "/index",
        json!({ "id": "doc1", "content": { "title": "Vector databases" } }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["key"], "embedding::doc1");
    assert_eq!(body["embedding"].as_array().unwrap().len(), 16);

    let (status, body) = post_json(
        build_router(state),
        "/search",
        json!({ "q": r#"{"title":"Vector databases"}"# }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let hits = body.as_array().unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0]["content"], json!({ "title": "Vector databases" }));
    assert!(hits[0]["score"].as_f64().unwrap() > 0.99);
}

#[tokio::test]
async fn index_accepts_raw_json_text() {
    let app = build_router(stub_state().await);
    let (status, body) = post_json(
        app,
        "/index",
        json!({ "id": "doc2", "content": r#"{"title":"B"}"# }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["key"], "embedding::doc2");
}

#[tokio::test]
async fn index_malformed_content_is_400() {
    let app = build_router(stub_state().await);
    let (status, body) = post_json(
        app,
        "/index",
        json!({ "id": "doc3", "content": "# just markdown" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn embed_without_files_is_400() {
    let app = build_router(stub_state().await);
    let (status, body) = post_json(app.clone(), "/embed", json!({ "files": [] })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "No files provided");

    let (status, _) = post_json(app, "/embed", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn embed_reports_each_file() {
    let dir = tempfile::tempdir().unwrap();
    let good = write_file(&dir, "good.json", r#"{"title":"Good"}"#);
    let bad = write_file(&dir, "bad.md", "not json");
    let missing = dir.path().join("missing.json").to_string_lossy().into_owned();

    let state = stub_state().await;
    let (status, body) = post_json(
        build_router(state.clone()),
        "/embed",
        json!({ "files": [good, missing, bad] }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["indexed"], 1);
    assert_eq!(body["failed"], 2);

    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(results[0]["key"], "embedding::good.json");
    assert_eq!(results[0]["embedding_dim"], 16);
    assert!(results[1]["error"].as_str().unwrap().contains("does not exist"));
    assert!(results[2]["error"].as_str().unwrap().contains("bad.md"));

    let stored = state.engine.store().get("embedding::good.json".into()).await.unwrap();
    assert!(stored.is_some());
}

#[tokio::test]
async fn embed_with_embedding_service_down_is_500() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_file(&dir, "test.json", r#"{"title":"T"}"#);

    let app = build_router(down_state());
    let (status, body) = post_json(app, "/embed", json!({ "files": [file] })).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["message"], "Error embedding and storing files");
}

#[tokio::test]
async fn health_and_ready() {
    let state = stub_state().await;

    let started = server::routes::health::record_start_time();
    let (status, body) = get(build_router(state.clone()), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(
        body["started_at"],
        chrono::DateTime::<chrono::Utc>::from(started).to_rfc3339()
    );
    assert!(body["uptime_seconds"].is_u64());

    let (status, body) = get(build_router(state), "/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
    assert_eq!(body["engine"]["strategy"], "stub");
    assert_eq!(body["engine"]["documents"], 0);
}

#[tokio::test]
async fn unknown_route_is_404() {
    let app = build_router(stub_state().await);
    let (status, body) = get(app, "/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn request_id_is_echoed() {
    let app = build_router(stub_state().await);
    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "abc-123")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.headers()["x-request-id"], "abc-123");
}
