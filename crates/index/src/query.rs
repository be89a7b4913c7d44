use crate::{DocumentStore, IndexError};
use serde::{Deserialize, Serialize};

/// A nearest-neighbour request against a named vector index.
///
/// The index, collection and field names must match what the store was opened with;
/// a mismatch is reported as [`IndexError::UnknownIndex`] rather than an empty result.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorQuery {
    pub index: String,
    pub collection: String,
    pub field: String,
    pub vector: Vec<f32>,
    /// Upper bound on hits returned.
    pub num_candidates: usize,
}

impl VectorQuery {
    pub fn new(
        index: impl Into<String>,
        collection: impl Into<String>,
        field: impl Into<String>,
        vector: Vec<f32>,
    ) -> Self {
        Self {
            index: index.into(),
            collection: collection.into(),
            field: field.into(),
            vector,
            num_candidates: 5,
        }
    }

    pub fn with_num_candidates(mut self, num_candidates: usize) -> Self {
        self.num_candidates = num_candidates;
        self
    }
}

/// One ranked hit: the stored key and its cosine similarity to the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorHit {
    pub id: String,
    pub score: f32,
}

impl DocumentStore {
    /// Rank stored vectors by cosine similarity to `query.vector`, best first.
    ///
    /// Documents without a vector never appear.
    pub fn vector_search(&self, query: &VectorQuery) -> Result<Vec<VectorHit>, IndexError> {
        self.check_target(query)?;

        if query.vector.is_empty() {
            return Err(IndexError::InvalidVector(
                "query vector must not be empty".into(),
            ));
        }

        self.ensure_graph_built()?;

        let ann = self
            .ann
            .read()
            .map_err(|_| IndexError::backend("poisoned lock"))?;
        let results = ann
            .search(&query.vector, query.num_candidates)
            .map_err(IndexError::from)?;

        Ok(results
            .into_iter()
            .map(|result| VectorHit {
                id: result.id,
                score: 1.0 - result.distance,
            })
            .collect())
    }

    fn check_target(&self, query: &VectorQuery) -> Result<(), IndexError> {
        let cfg = self.config();
        if query.index != cfg.index_name {
            return Err(IndexError::UnknownIndex(format!(
                "no vector index named '{}'",
                query.index
            )));
        }
        if query.collection != cfg.collection {
            return Err(IndexError::UnknownIndex(format!(
                "index '{}' does not cover collection '{}'",
                query.index, query.collection
            )));
        }
        if query.field != cfg.vector_field {
            return Err(IndexError::UnknownIndex(format!(
                "index '{}' is not defined on field '{}'",
                query.index, query.field
            )));
        }
        Ok(())
    }

    /// Rebuild the HNSW graph if writes have made it stale and it is worth having.
    fn ensure_graph_built(&self) -> Result<(), IndexError> {
        let stale = self
            .ann
            .read()
            .map_err(|_| IndexError::backend("poisoned lock"))?
            .needs_build();
        if stale {
            let mut ann = self
                .ann
                .write()
                .map_err(|_| IndexError::backend("poisoned lock"))?;
            // Another searcher may have rebuilt it while we waited.
            if ann.needs_build() {
                log::debug!("rebuilding HNSW graph over {} vectors", ann.len());
                ann.build();
            }
        }
        Ok(())
    }
}
