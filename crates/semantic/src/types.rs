use serde::{Deserialize, Serialize};

/// Embedding output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Embedding {
    /// Final embedding values.
    pub vector: Vec<f32>,
    /// Name of the model (or strategy) that produced the vector.
    pub model_name: String,
    /// Dimension of `vector`.
    pub embedding_dim: usize,
}

impl Embedding {
    pub fn new(vector: Vec<f32>, model_name: impl Into<String>) -> Self {
        let embedding_dim = vector.len();
        Self {
            vector,
            model_name: model_name.into(),
            embedding_dim,
        }
    }

    pub fn into_vector(self) -> Vec<f32> {
        self.vector
    }
}
