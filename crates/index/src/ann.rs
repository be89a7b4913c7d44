//! Approximate Nearest Neighbor (ANN) search using the HNSW algorithm.
//!
//! The index keeps the raw vectors next to the graph so it can always answer with an
//! exact linear scan. The HNSW graph is only consulted once it has been built for the
//! current contents and the collection is large enough for it to pay off.
//!
//! ## Trade-offs
//!
//! - **Speed**: sub-linear lookups on large collections
//! - **Recall**: typically 95-99%, some true neighbours may be missed
//! - **Writes**: `hnsw_rs` cannot delete points, so any write marks the graph stale and the
//!   next search rebuilds it (see [`AnnIndex::needs_build`])

use hnsw_rs::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Configuration for ANN index construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnConfig {
    /// Number of neighbors per node (higher = better recall, slower build).
    /// Default: 16
    pub m: usize,
    /// Size of dynamic candidate list during construction.
    /// Default: 200
    pub ef_construction: usize,
    /// Size of dynamic candidate list during search.
    /// Default: 50
    pub ef_search: usize,
    /// Upper bound on results returned by one search.
    /// Default: 100
    pub max_results: usize,
    /// Whether to use ANN or always fall back to linear scan.
    pub enabled: bool,
    /// Minimum number of vectors before ANN is used.
    /// Default: 1000
    pub min_vectors_for_ann: usize,
}

impl Default for AnnConfig {
    fn default() -> Self {
        Self {
            m: 16,
            ef_construction: 200,
            ef_search: 50,
            max_results: 100,
            enabled: true,
            min_vectors_for_ann: 1000,
        }
    }
}

impl AnnConfig {
    pub fn with_m(mut self, m: usize) -> Self {
        self.m = m;
        self
    }

    pub fn with_ef_construction(mut self, ef: usize) -> Self {
        self.ef_construction = ef;
        self
    }

    pub fn with_ef_search(mut self, ef: usize) -> Self {
        self.ef_search = ef;
        self
    }

    pub fn with_max_results(mut self, max: usize) -> Self {
        self.max_results = max;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_min_vectors_for_ann(mut self, min: usize) -> Self {
        self.min_vectors_for_ann = min;
        self
    }

    /// Check if ANN should be used given the current dataset size.
    pub fn should_use_ann(&self, num_vectors: usize) -> bool {
        self.enabled && num_vectors >= self.min_vectors_for_ann
    }
}

/// Result from ANN search.
#[derive(Debug, Clone)]
pub struct AnnResult {
    /// Identifier the vector was inserted under.
    pub id: String,
    /// Cosine distance to the query vector (lower = closer).
    pub distance: f32,
}

/// ANN index over string-keyed vectors of one fixed dimension.
pub struct AnnIndex {
    config: AnnConfig,
    /// Fixed by the first vector inserted; cleared again when the index empties.
    dimension: Option<usize>,
    hnsw: Option<Hnsw<'static, f32, DistCosine>>,
    id_to_slot: HashMap<String, usize>,
    ids: Vec<String>,
    vectors: Vec<Vec<f32>>,
    built: bool,
}

impl AnnIndex {
    /// Create a new empty ANN index.
    pub fn new(config: AnnConfig) -> Self {
        Self {
            config,
            dimension: None,
            hnsw: None,
            id_to_slot: HashMap::new(),
            ids: Vec::new(),
            vectors: Vec::new(),
            built: false,
        }
    }

    /// Dimension every vector must have, if one has been established.
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    /// Check that `vector` fits this index without modifying anything.
    pub fn check_dimension(&self, vector: &[f32]) -> Result<(), AnnError> {
        if vector.is_empty() {
            return Err(AnnError::EmptyVector);
        }
        match self.dimension {
            Some(expected) if expected != vector.len() => Err(AnnError::DimensionMismatch {
                expected,
                got: vector.len(),
            }),
            _ => Ok(()),
        }
    }

    /// Insert a vector, replacing the previous one stored under the same ID.
    pub fn upsert(&mut self, id: String, vector: Vec<f32>) -> Result<(), AnnError> {
        self.check_dimension(&vector)?;
        self.dimension = Some(vector.len());

        match self.id_to_slot.get(&id) {
            Some(&slot) => self.vectors[slot] = vector,
            None => {
                let slot = self.vectors.len();
                self.vectors.push(vector);
                self.ids.push(id.clone());
                self.id_to_slot.insert(id, slot);
            }
        }

        self.built = false;
        Ok(())
    }

    /// Remove a vector. Returns `true` if the ID was present.
    pub fn remove(&mut self, id: &str) -> bool {
        let Some(slot) = self.id_to_slot.remove(id) else {
            return false;
        };

        self.vectors.swap_remove(slot);
        self.ids.swap_remove(slot);
        if let Some(moved) = self.ids.get(slot) {
            self.id_to_slot.insert(moved.clone(), slot);
        }
        if self.vectors.is_empty() {
            self.dimension = None;
        }

        self.built = false;
        self.hnsw = None;
        true
    }

    /// Search for the `k` nearest neighbours, closest first.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<AnnResult>, AnnError> {
        let Some(dimension) = self.dimension else {
            return Ok(Vec::new());
        };
        if query.len() != dimension {
            return Err(AnnError::DimensionMismatch {
                expected: dimension,
                got: query.len(),
            });
        }

        let k = k.min(self.config.max_results);
        if k == 0 {
            return Ok(Vec::new());
        }

        if self.built && self.config.should_use_ann(self.vectors.len()) && self.hnsw.is_some() {
            self.hnsw_search(query, k)
        } else {
            Ok(self.linear_search(query, k))
        }
    }

    /// HNSW-based approximate search.
    fn hnsw_search(&self, query: &[f32], k: usize) -> Result<Vec<AnnResult>, AnnError> {
        let hnsw = self.hnsw.as_ref().ok_or(AnnError::NotBuilt)?;
        let neighbours: Vec<Neighbour> = hnsw.search(query, k, self.config.ef_search.max(k));

        let mut results: Vec<AnnResult> = neighbours
            .into_iter()
            .filter_map(|neighbour| {
                self.ids.get(neighbour.get_origin_id()).map(|id| AnnResult {
                    id: id.clone(),
                    distance: neighbour.distance,
                })
            })
            .collect();
        results.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        Ok(results)
    }

    /// Linear search (exact).
    fn linear_search(&self, query: &[f32], k: usize) -> Vec<AnnResult> {
        let mut distances: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(slot, vec)| (slot, cosine_distance(query, vec)))
            .collect();

        // Ties keep insertion order.
        distances.sort_by(|a, b| a.1.total_cmp(&b.1));

        distances
            .into_iter()
            .take(k)
            .map(|(slot, distance)| AnnResult {
                id: self.ids[slot].clone(),
                distance,
            })
            .collect()
    }

    /// Number of vectors in index.
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.id_to_slot.contains_key(id)
    }

    /// Check if the HNSW graph reflects the current contents.
    pub fn is_built(&self) -> bool {
        self.built
    }

    /// True when a search would benefit from building the graph first.
    pub fn needs_build(&self) -> bool {
        !self.built && self.config.should_use_ann(self.vectors.len())
    }

    /// Build the HNSW graph over the current vectors.
    /// Below 10 vectors the graph is skipped and searches stay linear.
    pub fn build(&mut self) {
        if self.vectors.is_empty() {
            self.hnsw = None;
            self.built = true;
            return;
        }

        let nb_elem = self.vectors.len();
        if nb_elem < 10 {
            self.hnsw = None;
            self.built = true;
            return;
        }

        let nb_layer = 16.min((nb_elem as f32).ln().trunc() as usize).max(1);
        let hnsw = Hnsw::<f32, DistCosine>::new(
            self.config.m,
            nb_elem,
            nb_layer,
            self.config.ef_construction,
            DistCosine {},
        );

        // Slot numbers double as HNSW origin IDs.
        let data_for_insertion: Vec<(&Vec<f32>, usize)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(slot, vec)| (vec, slot))
            .collect();
        hnsw.parallel_insert(&data_for_insertion);

        self.hnsw = Some(hnsw);
        self.built = true;
    }

    /// Drop the current graph and build a fresh one.
    pub fn rebuild(&mut self) {
        self.built = false;
        self.hnsw = None;
        self.build();
    }

    /// Get current configuration.
    pub fn config(&self) -> &AnnConfig {
        &self.config
    }
}

/// Error type for ANN operations.
#[derive(Debug, thiserror::Error)]
pub enum AnnError {
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
    #[error("Vector must not be empty")]
    EmptyVector,
    #[error("Index not built")]
    NotBuilt,
}

/// Calculate cosine distance (1 - cosine similarity).
/// Lower values mean vectors are more similar.
pub(crate) fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }

    let similarity = dot / (norm_a * norm_b);
    1.0 - similarity.clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn axis_index() -> AnnIndex {
        let mut index = AnnIndex::new(AnnConfig::default());
        index.upsert("doc1".into(), vec![1.0, 0.0, 0.0]).unwrap();
        index.upsert("doc2".into(), vec![0.0, 1.0, 0.0]).unwrap();
        index.upsert("doc3".into(), vec![0.0, 0.0, 1.0]).unwrap();
        index
    }

    #[test]
    fn test_ann_config_defaults() {
        let config = AnnConfig::default();
        assert_eq!(config.m, 16);
        assert_eq!(config.ef_construction, 200);
        assert_eq!(config.ef_search, 50);
        assert!(config.enabled);
        assert_eq!(config.min_vectors_for_ann, 1000);
    }

    #[test]
    fn test_should_use_ann() {
        let config = AnnConfig::default();
        assert!(config.should_use_ann(1000));
        assert!(!config.should_use_ann(999));

        let disabled = AnnConfig::default().with_enabled(false);
        assert!(!disabled.should_use_ann(10_000));
    }

    #[test]
    fn test_linear_search_orders_by_distance() {
        let index = axis_index();
        let results = index.search(&[0.9, 0.1, 0.0], 2).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, "doc1");
        assert_eq!(results[1].id, "doc2");
        assert!(results[0].distance < results[1].distance);
    }

    #[test]
    fn test_upsert_replaces_existing_vector() {
        let mut index = axis_index();
        index.upsert("doc1".into(), vec![0.0, 0.0, 1.0]).unwrap();
        assert_eq!(index.len(), 3);

        let results = index.search(&[1.0, 0.0, 0.0], 1).unwrap();
        assert_ne!(results[0].id, "doc1");
    }

    #[test]
    fn test_dimension_fixed_by_first_vector() {
        let mut index = AnnIndex::new(AnnConfig::default());
        assert_eq!(index.dimension(), None);
        index.upsert("doc1".into(), vec![1.0, 0.0, 0.0]).unwrap();
        assert_eq!(index.dimension(), Some(3));

        let result = index.upsert("doc2".into(), vec![1.0, 0.0]);
        assert!(matches!(
            result,
            Err(AnnError::DimensionMismatch { expected: 3, got: 2 })
        ));
        assert!(!index.contains("doc2"));

        let result = index.search(&[1.0, 0.0], 1);
        assert!(matches!(result, Err(AnnError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_empty_vector_rejected() {
        let mut index = AnnIndex::new(AnnConfig::default());
        assert!(matches!(
            index.upsert("doc".into(), vec![]),
            Err(AnnError::EmptyVector)
        ));
    }

    #[test]
    fn test_remove_keeps_mapping_consistent() {
        let mut index = axis_index();
        assert!(index.remove("doc1"));
        assert!(!index.remove("doc1"));
        assert_eq!(index.len(), 2);

        // doc3 was swapped into slot 0; it must still resolve to itself.
        let results = index.search(&[0.0, 0.0, 1.0], 1).unwrap();
        assert_eq!(results[0].id, "doc3");
    }

    #[test]
    fn test_remove_last_resets_dimension() {
        let mut index = AnnIndex::new(AnnConfig::default());
        index.upsert("only".into(), vec![1.0, 2.0]).unwrap();
        index.remove("only");
        assert!(index.is_empty());
        assert_eq!(index.dimension(), None);
        index.upsert("new".into(), vec![1.0, 2.0, 3.0]).unwrap();
        assert_eq!(index.dimension(), Some(3));
    }

    #[test]
    fn test_empty_search() {
        let index = AnnIndex::new(AnnConfig::default());
        assert!(index.search(&[1.0, 0.0, 0.0], 5).unwrap().is_empty());
    }

    #[test]
    fn test_search_respects_k() {
        let mut index = AnnIndex::new(AnnConfig::default());
        for i in 0..5 {
            index
                .upsert(format!("doc{i}"), vec![1.0, i as f32, 0.0])
                .unwrap();
        }
        assert_eq!(index.search(&[1.0, 0.0, 0.0], 2).unwrap().len(), 2);
        assert_eq!(index.search(&[1.0, 0.0, 0.0], 10).unwrap().len(), 5);
        assert!(index.search(&[1.0, 0.0, 0.0], 0).unwrap().is_empty());
    }

    #[test]
    fn test_build_and_hnsw_search() {
        let mut index = AnnIndex::new(AnnConfig::default().with_min_vectors_for_ann(1));
        for i in 0..32 {
            let angle = i as f32 * 0.1;
            index
                .upsert(format!("doc{i}"), vec![angle.cos(), angle.sin(), 0.5])
                .unwrap();
        }
        assert!(index.needs_build());

        index.build();
        assert!(index.is_built());
        assert!(!index.needs_build());

        let results = index.search(&[1.0, 0.0, 0.5], 3).unwrap();
        assert_eq!(results.len(), 3);
        assert!(results.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    #[test]
    fn test_writes_invalidate_build() {
        let mut index = AnnIndex::new(AnnConfig::default().with_min_vectors_for_ann(1));
        index.upsert("doc1".into(), vec![1.0, 0.0, 0.0]).unwrap();
        index.build();
        assert!(index.is_built());

        index.upsert("doc2".into(), vec![0.0, 1.0, 0.0]).unwrap();
        assert!(!index.is_built());

        index.rebuild();
        assert!(index.is_built());
    }

    #[test]
    fn test_cosine_distance() {
        assert!(cosine_distance(&[1.0, 0.0], &[1.0, 0.0]).abs() < 0.001);
        assert!((cosine_distance(&[1.0, 0.0], &[0.0, 1.0]) - 1.0).abs() < 0.001);
        assert!((cosine_distance(&[1.0, 0.0], &[-1.0, 0.0]) - 2.0).abs() < 0.001);
        assert_eq!(cosine_distance(&[0.0, 0.0], &[1.0, 0.0]), 1.0);
    }
}
