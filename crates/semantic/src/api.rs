use serde_json::{json, Value};

use crate::{Embedding, SemanticConfig, SemanticError};

/// Remote embedding strategy: one POST per text to an OpenAI-compatible endpoint.
///
/// Failures are returned to the caller after the first attempt. Retrying is left to
/// whoever owns the request.
#[derive(Debug, Clone)]
pub struct RemoteEmbedder {
    client: reqwest::Client,
    url: String,
    api_key: String,
    model_name: String,
}

impl RemoteEmbedder {
    /// Build the HTTP client once; it is reused (and pooled) for the life of the provider.
    pub fn new(cfg: &SemanticConfig) -> Result<Self, SemanticError> {
        let api_key = cfg
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                SemanticError::InvalidConfig("api_key is required for remote mode".into())
            })?;

        let mut builder = reqwest::Client::builder().pool_max_idle_per_host(32);
        if let Some(timeout) = cfg.api_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| SemanticError::InvalidConfig(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: cfg.api_url.clone(),
            api_key,
            model_name: cfg.model_name.clone(),
        })
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub async fn embed(&self, text: &str) -> Result<Embedding, SemanticError> {
        let payload = json!({ "model": self.model_name, "input": text });
        let response = self.send(payload).await?;

        let vector = parse_embeddings_from_value(response)
            .map_err(SemanticError::Remote)?
            .into_iter()
            .next()
            .ok_or_else(|| SemanticError::Remote("API response did not contain embeddings".into()))?;

        Ok(Embedding::new(vector, self.model_name.clone()))
    }

    async fn send(&self, payload: Value) -> Result<Value, SemanticError> {
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| SemanticError::Remote(format!("HTTP request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(%status, model = %self.model_name, "embedding service rejected request");
            return Err(SemanticError::Remote(format!("HTTP error {status}: {body}")));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| SemanticError::Remote(format!("Invalid JSON response: {e}")))
    }
}

/// Extract every vector from an embedding payload.
///
/// Accepts the OpenAI `{"data":[{"embedding":[..]}]}` shape, `{"embeddings": ..}`, or a bare
/// (nested) array. Errors are plain strings so each strategy can wrap them in its own variant.
pub(crate) fn parse_embeddings_from_value(value: Value) -> Result<Vec<Vec<f32>>, String> {
    match value {
        Value::Object(mut map) => {
            if let Some(embeddings) = map.remove("embeddings") {
                return parse_embedding_collection(embeddings);
            }

            if let Some(Value::Array(items)) = map.remove("data") {
                let mut vectors = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::Object(mut obj) => match obj.remove("embedding") {
                            Some(embedding) => vectors.push(parse_embedding_vector(embedding)?),
                            None => return Err("missing `embedding` field in data item".into()),
                        },
                        _ => return Err("unexpected entry inside `data` array".into()),
                    }
                }
                return Ok(vectors);
            }

            Err("unsupported embedding payload shape".into())
        }
        other => parse_embedding_collection(other),
    }
}

fn parse_embedding_collection(value: Value) -> Result<Vec<Vec<f32>>, String> {
    match value {
        Value::Array(items) => {
            if items.is_empty() {
                Ok(Vec::new())
            } else if items.iter().all(|item| matches!(item, Value::Array(_))) {
                items.into_iter().map(parse_embedding_vector).collect()
            } else {
                parse_embedding_vector(Value::Array(items)).map(|vec| vec![vec])
            }
        }
        other => parse_embedding_vector(other).map(|vec| vec![vec]),
    }
}

fn parse_embedding_vector(value: Value) -> Result<Vec<f32>, String> {
    match value {
        Value::Array(values) => values
            .into_iter()
            .map(|entry| match entry {
                Value::Number(num) => num
                    .as_f64()
                    .map(|f| f as f32)
                    .ok_or_else(|| "non-finite embedding value".to_string()),
                other => Err(format!("embedding entries must be numbers, got {other:?}")),
            })
            .collect(),
        other => Err(format!("embedding vector must be an array, got {other:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::IntoResponse;
    use axum::routing::post;
    use axum::{Json, Router};

    async fn spawn_service(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/v1/embeddings")
    }

    fn remote_config(url: String) -> SemanticConfig {
        SemanticConfig::remote("sk-test").with_api_url(url)
    }

    #[test]
    fn new_requires_api_key() {
        let cfg = SemanticConfig::default();
        assert!(matches!(
            RemoteEmbedder::new(&cfg),
            Err(SemanticError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn embed_sends_model_and_input_and_reads_first_vector() {
        let app = Router::new().route(
            "/v1/embeddings",
            post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                let auth = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                if auth != "Bearer sk-test" {
                    return (StatusCode::UNAUTHORIZED, "bad key").into_response();
                }
                assert_eq!(body["model"], "text-embedding-ada-002");
                assert_eq!(body["input"], "hello world");
                Json(json!({
                    "data": [{ "embedding": [0.25, 0.5, 0.75], "index": 0 }],
                    "model": "text-embedding-ada-002"
                }))
                .into_response()
            }),
        );
        let url = spawn_service(app).await;

        let embedder = RemoteEmbedder::new(&remote_config(url)).unwrap();
        let embedding = embedder.embed("hello world").await.unwrap();
        assert_eq!(embedding.vector, vec![0.25, 0.5, 0.75]);
        assert_eq!(embedding.embedding_dim, 3);
        assert_eq!(embedding.model_name, "text-embedding-ada-002");
    }

    #[tokio::test]
    async fn rate_limit_status_is_remote_failure() {
        let app = Router::new().route(
            "/v1/embeddings",
            post(|| async { (StatusCode::TOO_MANY_REQUESTS, "slow down") }),
        );
        let url = spawn_service(app).await;

        let embedder = RemoteEmbedder::new(&remote_config(url)).unwrap();
        let err = embedder.embed("text").await.unwrap_err();
        assert!(matches!(err, SemanticError::Remote(ref msg) if msg.contains("429")));
    }

    #[tokio::test]
    async fn empty_data_is_remote_failure() {
        let app = Router::new().route(
            "/v1/embeddings",
            post(|| async { Json(json!({ "data": [] })) }),
        );
        let url = spawn_service(app).await;

        let embedder = RemoteEmbedder::new(&remote_config(url)).unwrap();
        assert!(matches!(
            embedder.embed("text").await,
            Err(SemanticError::Remote(_))
        ));
    }

    #[tokio::test]
    async fn unreachable_service_is_remote_failure() {
        // Port 9 (discard) on loopback is closed in test environments.
        let embedder =
            RemoteEmbedder::new(&remote_config("http://127.0.0.1:9/v1/embeddings".into()))
                .unwrap();
        assert!(matches!(
            embedder.embed("text").await,
            Err(SemanticError::Remote(_))
        ));
    }

    #[test]
    fn parse_openai_shape() {
        let vectors = parse_embeddings_from_value(json!({
            "data": [{ "embedding": [1.0, 2.0] }, { "embedding": [3.0, 4.0] }]
        }))
        .unwrap();
        assert_eq!(vectors, vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
    }

    #[test]
    fn parse_embedding_collection_various_formats() {
        let nested = parse_embedding_collection(json!([[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]])).unwrap();
        assert_eq!(nested.len(), 2);
        assert_eq!(nested[0], vec![1.0, 2.0, 3.0]);

        let single = parse_embedding_collection(json!([1.0, 2.0, 3.0])).unwrap();
        assert_eq!(single, vec![vec![1.0, 2.0, 3.0]]);

        assert!(parse_embedding_collection(json!([])).unwrap().is_empty());
    }

    #[test]
    fn parse_rejects_non_numeric_entries() {
        assert!(parse_embeddings_from_value(json!({ "data": [{ "embedding": ["a"] }] })).is_err());
        assert!(parse_embeddings_from_value(json!({ "data": [{ "vector": [1.0] }] })).is_err());
        assert!(parse_embeddings_from_value(json!({ "unexpected": true })).is_err());
    }
}
