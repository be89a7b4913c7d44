use std::sync::Arc;

use index::{DocumentStore, IndexError, VectorHit, VectorQuery};
use serde_json::Value;

/// Async handle to the shared [`DocumentStore`].
///
/// The store does blocking IO, so every call runs on tokio's blocking pool. Clones share
/// one store; there is exactly one per [`SearchEngine`](crate::SearchEngine).
#[derive(Clone)]
pub struct StoreHandle {
    inner: Arc<DocumentStore>,
}

impl StoreHandle {
    pub fn new(store: DocumentStore) -> Self {
        Self {
            inner: Arc::new(store),
        }
    }

    pub fn store(&self) -> &DocumentStore {
        &self.inner
    }

    async fn run<T, F>(&self, op: F) -> Result<T, IndexError>
    where
        T: Send + 'static,
        F: FnOnce(&DocumentStore) -> Result<T, IndexError> + Send + 'static,
    {
        let store = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || op(&store))
            .await
            .map_err(|e| IndexError::backend(format!("store task failed: {e}")))?
    }

    pub async fn upsert(&self, key: String, document: Value) -> Result<(), IndexError> {
        self.run(move |store| store.upsert(&key, &document)).await
    }

    pub async fn get(&self, key: String) -> Result<Option<Value>, IndexError> {
        self.run(move |store| store.get(&key)).await
    }

    pub async fn delete(&self, key: String) -> Result<(), IndexError> {
        self.run(move |store| store.delete(&key)).await
    }

    pub async fn vector_search(&self, query: VectorQuery) -> Result<Vec<VectorHit>, IndexError> {
        self.run(move |store| store.vector_search(&query)).await
    }

    pub async fn len(&self) -> Result<usize, IndexError> {
        self.run(|store| store.len()).await
    }

    pub async fn flush(&self) -> Result<(), IndexError> {
        self.run(|store| store.flush()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use index::StoreConfig;
    use serde_json::json;

    #[tokio::test]
    async fn handle_round_trips_through_blocking_pool() {
        let handle = StoreHandle::new(DocumentStore::open(StoreConfig::default()).unwrap());
        let clone = handle.clone();

        handle
            .upsert("embedding::a".into(), json!({ "title": "A", "embedding": [1.0, 0.0] }))
            .await
            .unwrap();

        assert_eq!(
            clone.get("embedding::a".into()).await.unwrap(),
            Some(json!({ "title": "A", "embedding": [1.0, 0.0] }))
        );
        assert_eq!(clone.len().await.unwrap(), 1);

        let hits = clone
            .vector_search(VectorQuery::new(
                "embeddings-index",
                "documents",
                "embedding",
                vec![1.0, 0.0],
            ))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);

        handle.delete("embedding::a".into()).await.unwrap();
        assert_eq!(handle.get("embedding::a".into()).await.unwrap(), None);
        handle.flush().await.unwrap();
    }
}
