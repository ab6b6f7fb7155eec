//! In-memory store: brute-force cosine search, no persistence.
//!
//! Useful for tests and offline demos where pulling in SQLite would only
//! slow things down.

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

use crate::types::DocloomError;

use super::{ChunkRecord, VectorStore};

/// Keeps every record in a `Vec` and scans it on search.
#[derive(Default)]
pub struct MemoryVectorStore {
    records: RwLock<Vec<ChunkRecord>>,
}

impl MemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() {
            return 0.0;
        }
        let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }
        dot / (norm_a * norm_b)
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn ping(&self) -> Result<(), DocloomError> {
        Ok(())
    }

    async fn insert_chunks(&self, records: Vec<ChunkRecord>) -> Result<(), DocloomError> {
        let mut guard = self.records.write();
        debug!(inserted = records.len(), "memory store insert");
        guard.extend(records);
        Ok(())
    }

    async fn get_chunks_by_source(&self, source: &str) -> Result<Vec<ChunkRecord>, DocloomError> {
        let guard = self.records.read();
        Ok(guard
            .iter()
            .filter(|record| record.source == source)
            .cloned()
            .collect())
    }

    async fn delete_chunks_by_source(&self, source: &str) -> Result<usize, DocloomError> {
        let mut guard = self.records.write();
        let before = guard.len();
        guard.retain(|record| record.source != source);
        Ok(before - guard.len())
    }

    async fn search_similar(
        &self,
        query: &[f32],
        top_k: usize,
    ) -> Result<Vec<(ChunkRecord, f32)>, DocloomError> {
        let guard = self.records.read();
        let mut scored: Vec<(ChunkRecord, f32)> = guard
            .iter()
            .filter_map(|record| {
                let embedding = record.embedding.as_ref()?;
                let score = Self::cosine_similarity(query, embedding);
                Some((record.clone(), score))
            })
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn count(&self) -> Result<usize, DocloomError> {
        Ok(self.records.read().len())
    }
}
