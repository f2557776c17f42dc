use async_trait::async_trait;

use super::error::EmbeddingError;

/// A produced embedding plus its provenance. `model_version` is persisted
/// alongside the vector so a model bump is visible per record.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    pub vector: Vec<f32>,
    pub provider: String,
    pub model_version: String,
}

/// Text→vector conversion. Implementations publish a fixed dimension which
/// must equal the vector store's; the caller verifies on every response.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embeds one text. Vectors are L2-normalized (downstream similarity is
    /// cosine).
    async fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError>;

    /// The fixed output dimension.
    fn dimensions(&self) -> usize;

    /// The model version label recorded on produced embeddings.
    fn model_version(&self) -> &str;

    /// Stable provider label (`primary`, `secondary`, `local`).
    fn name(&self) -> &'static str;
}

/// Normalizes `vector` to unit length in place. A zero vector is left
/// untouched rather than producing NaNs.
pub fn l2_normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for v in vector.iter_mut() {
            *v /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_produces_unit_length() {
        let mut v = vec![3.0, 4.0];
        l2_normalize(&mut v);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
    }

    #[test]
    fn normalize_leaves_zero_vector() {
        let mut v = vec![0.0, 0.0, 0.0];
        l2_normalize(&mut v);
        assert!(v.iter().all(|x| *x == 0.0));
    }
}
