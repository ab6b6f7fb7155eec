//! Batched embedding and persistence of chunks.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::chunking::Chunk;
use crate::config::LoadConfig;
use crate::embeddings::EmbeddingProvider;
use crate::stores::{ChunkRecord, VectorStore};
use crate::types::DocloomError;

/// Outcome of one load stage.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct LoadReport {
    /// Chunks embedded and persisted.
    pub chunks_written: usize,
    /// Store write calls that committed.
    pub batches_committed: usize,
}

/// Writes chunks to the vector store in bounded, strictly sequential batches.
///
/// The load is at-least-once, not atomic: a failure in batch `i` aborts the
/// run but leaves batches `0..i` durably committed. Re-running the same load
/// re-embeds everything and appends duplicate records.
pub struct BatchLoader {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    config: LoadConfig,
}

impl BatchLoader {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        config: LoadConfig,
    ) -> Result<Self, DocloomError> {
        config.validate()?;
        Ok(Self {
            embedder,
            store,
            config,
        })
    }

    pub fn config(&self) -> &LoadConfig {
        &self.config
    }

    /// Verifies store connectivity, then embeds and persists every batch.
    ///
    /// The connectivity check runs before any embedding call; its failure
    /// aborts the load with [`DocloomError::Connectivity`] and nothing
    /// written.
    pub async fn load(&self, chunks: Vec<Chunk>) -> Result<LoadReport, DocloomError> {
        bounded(self.store.ping(), self.config.call_timeout, "connectivity check").await?;

        if chunks.is_empty() {
            return Ok(LoadReport::default());
        }

        let batch_size = self.config.batch_size;
        let total_batches = chunks.len().div_ceil(batch_size);
        info!(
            chunks = chunks.len(),
            batches = total_batches,
            embedder = self.embedder.id(),
            "loading chunks into vector store"
        );

        let mut report = LoadReport::default();
        for (batch_index, batch) in chunks.chunks(batch_size).enumerate() {
            let texts: Vec<String> = batch.iter().map(|chunk| chunk.text.clone()).collect();
            let embeddings = bounded(
                self.embedder.embed_batch(&texts),
                self.config.call_timeout,
                "embedding call",
            )
            .await?;

            if embeddings.len() != batch.len() {
                return Err(DocloomError::Embedding(format!(
                    "provider returned {} vectors for {} chunks",
                    embeddings.len(),
                    batch.len()
                )));
            }

            let records: Vec<ChunkRecord> = batch
                .iter()
                .zip(embeddings)
                .map(|(chunk, embedding)| ChunkRecord::from_chunk(chunk, embedding))
                .collect();

            bounded(
                self.store.insert_chunks(records),
                self.config.call_timeout,
                "store write",
            )
            .await?;

            report.chunks_written += batch.len();
            report.batches_committed += 1;
            info!(
                batch = batch_index + 1,
                total = total_batches,
                size = batch.len(),
                "committed batch"
            );
        }

        Ok(report)
    }
}

/// Applies the configured deadline to one external call.
async fn bounded<T>(
    call: impl Future<Output = Result<T, DocloomError>>,
    timeout: Duration,
    operation: &'static str,
) -> Result<T, DocloomError> {
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(DocloomError::Timeout {
            operation,
            timeout_ms: timeout.as_millis() as u64,
        }),
    }
}
