//! Similarity retrieval over an ingested corpus.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::config::DEFAULT_CALL_TIMEOUT;
use crate::embeddings::EmbeddingProvider;
use crate::stores::{ChunkRecord, VectorStore};
use crate::types::DocloomError;

const DEFAULT_TOP_K: usize = 4;

/// Embeds a question and returns the closest stored chunks.
///
/// This is the read side of the corpus; the chat layer composes the returned
/// passages into whatever prompt it likes.
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    top_k: usize,
    call_timeout: Duration,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, store: Arc<dyn VectorStore>) -> Self {
        Self {
            embedder,
            store,
            top_k: DEFAULT_TOP_K,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    #[must_use]
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Returns up to `top_k` `(record, similarity)` pairs, best first.
    pub async fn retrieve(
        &self,
        query: &str,
    ) -> Result<Vec<(ChunkRecord, f32)>, DocloomError> {
        let query_texts = [query.to_string()];
        let mut vectors = tokio::time::timeout(
            self.call_timeout,
            self.embedder.embed_batch(&query_texts),
        )
        .await
        .map_err(|_| DocloomError::Timeout {
            operation: "query embedding",
            timeout_ms: self.call_timeout.as_millis() as u64,
        })??;

        let query_vector = vectors.pop().ok_or_else(|| {
            DocloomError::Embedding("provider returned no vector for the query".into())
        })?;

        let results = tokio::time::timeout(
            self.call_timeout,
            self.store.search_similar(&query_vector, self.top_k),
        )
        .await
        .map_err(|_| DocloomError::Timeout {
            operation: "similarity search",
            timeout_ms: self.call_timeout.as_millis() as u64,
        })??;

        debug!(query_len = query.len(), results = results.len(), "retrieved chunks");
        Ok(results)
    }
}
