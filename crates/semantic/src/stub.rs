use fxhash::hash64;

use crate::Embedding;

/// Deterministic offline embedder.
///
/// Generates sinusoid values derived from a hash of the input text so that identical
/// text always maps to the identical vector, with no model and no network.
#[derive(Debug, Clone)]
pub struct StubEmbedder {
    dimension: usize,
    model_name: String,
}

impl StubEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            model_name: "stub".into(),
        }
    }

    pub fn with_model_name(mut self, model_name: impl Into<String>) -> Self {
        self.model_name = model_name.into();
        self
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn embed(&self, text: &str) -> Embedding {
        let mut v = vec![0f32; self.dimension];
        let h = hash64(text.as_bytes());
        for (idx, value) in v.iter_mut().enumerate() {
            // Vary both the shift and the phase so neighbouring slots differ.
            *value = ((h >> (idx % 48)) as f32 * 0.0001 + idx as f32).sin();
        }
        scale_to_unit(&mut v);
        Embedding::new(v, self.model_name.clone())
    }
}

fn scale_to_unit(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter_mut().for_each(|x| *x /= norm);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_has_configured_dimension() {
        let embedding = StubEmbedder::new(384).embed("hello world");
        assert_eq!(embedding.embedding_dim, 384);
        assert_eq!(embedding.vector.len(), 384);
        assert_eq!(embedding.model_name, "stub");
    }

    #[test]
    fn stub_deterministic() {
        let stub = StubEmbedder::new(64);
        assert_eq!(stub.embed("same text").vector, stub.embed("same text").vector);
    }

    #[test]
    fn stub_different_text() {
        let stub = StubEmbedder::new(64);
        assert_ne!(stub.embed("hello").vector, stub.embed("world").vector);
    }

    #[test]
    fn stub_is_unit_length() {
        let embedding = StubEmbedder::new(128).embed("test");
        let norm: f32 = embedding.vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4, "got norm={norm}");
    }

    #[test]
    fn stub_handles_empty_and_unicode_text() {
        let stub = StubEmbedder::new(32);
        assert!(!stub.embed("").vector.iter().all(|&x| x == 0.0));
        assert!(!stub.embed("Hello 世界 🌍").vector.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn stub_preserves_model_name() {
        let stub = StubEmbedder::new(8).with_model_name("custom-model");
        assert_eq!(stub.embed("test").model_name, "custom-model");
    }
}
