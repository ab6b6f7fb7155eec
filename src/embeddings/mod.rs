//! Embedding capability: text in, fixed-dimension vectors out.

pub mod openai;

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::types::DocloomError;

pub use openai::OpenAiEmbeddingProvider;

/// Maps batches of text to embedding vectors.
///
/// The batch loader is responsible for batching and timeouts; implementations
/// only translate one batch into one backend call.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Short identifier for logs and telemetry.
    fn id(&self) -> &str;

    /// Dimensionality of every returned vector.
    fn dimensions(&self) -> usize;

    /// Embeds each input text, preserving order and length.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, DocloomError>;
}

/// Deterministic hash-derived embeddings for tests and offline demos.
///
/// Identical text always produces the identical vector, so pipeline tests can
/// make exact assertions without a network dependency. The invocation counter
/// lets tests assert that no embedding call happened at all.
pub struct MockEmbeddingProvider {
    dimensions: usize,
    calls: AtomicUsize,
}

impl MockEmbeddingProvider {
    pub fn new() -> Self {
        Self::with_dimensions(8)
    }

    pub fn with_dimensions(dimensions: usize) -> Self {
        Self {
            dimensions,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of `embed_batch` invocations so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn hash_to_vector(&self, text: &str) -> Vec<f32> {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let seed = hasher.finish();
        (0..self.dimensions)
            .map(|i| {
                let bits = seed.rotate_left((i % 64) as u32 * 8) ^ ((i as u64) << 24);
                (bits as f32) / u32::MAX as f32
            })
            .collect()
    }
}

impl Default for MockEmbeddingProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    fn id(&self) -> &str {
        "mock"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, DocloomError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|text| self.hash_to_vector(text)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_embeddings_are_deterministic() {
        let provider = MockEmbeddingProvider::new();
        let inputs = vec![
            "hello world".to_string(),
            "goodbye world".to_string(),
            "hello world".to_string(),
        ];

        let first = provider.embed_batch(&inputs).await.unwrap();
        let second = provider.embed_batch(&inputs).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first[0], first[2]);
        assert_ne!(first[0], first[1]);
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn vectors_match_declared_dimensionality() {
        let provider = MockEmbeddingProvider::with_dimensions(16);
        let vectors = provider
            .embed_batch(&["only one".to_string()])
            .await
            .unwrap();
        assert_eq!(vectors.len(), 1);
        assert_eq!(vectors[0].len(), provider.dimensions());
    }
}
