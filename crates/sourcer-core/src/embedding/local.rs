//! Deterministic in-process embedder for development and tests.
//!
//! Vectors are derived from a BLAKE3 extended output over the input text, so
//! identical text always produces the identical unit vector and distinct
//! texts produce uncorrelated ones. There is no semantic signal here; the
//! point is a stable, dependency-free stand-in with the right shape.
//! Production configuration refuses to select it.

use async_trait::async_trait;

use super::error::EmbeddingError;
use super::provider::{Embedding, EmbeddingProvider, l2_normalize};

pub const LOCAL_MODEL_VERSION: &str = "local-hash-1";

/// Dev-only deterministic provider.
#[derive(Debug, Clone)]
pub struct LocalEmbedder {
    dimensions: usize,
    max_input_chars: usize,
}

impl LocalEmbedder {
    pub fn new(dimensions: usize, max_input_chars: usize) -> Self {
        Self {
            dimensions,
            max_input_chars,
        }
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut reader = blake3::Hasher::new().update(text.as_bytes()).finalize_xof();
        let mut bytes = vec![0u8; self.dimensions * 4];
        reader.fill(&mut bytes);

        let mut vector = Vec::with_capacity(self.dimensions);
        for chunk in bytes.chunks_exact(4) {
            let raw = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            // Map to [-1, 1).
            vector.push((raw as f64 / u32::MAX as f64 * 2.0 - 1.0) as f32);
        }
        l2_normalize(&mut vector);
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for LocalEmbedder {
    async fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        let input = super::prepare_text(text, self.max_input_chars)?;
        Ok(Embedding {
            vector: self.vector_for(&input),
            provider: "local".to_string(),
            model_version: LOCAL_MODEL_VERSION.to_string(),
        })
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_version(&self) -> &str {
        LOCAL_MODEL_VERSION
    }

    fn name(&self) -> &'static str {
        "local"
    }
}
