//! Storage backends for embedded chunks.
//!
//! ```text
//!                  ┌──────────────────┐
//!                  │ VectorStore trait│
//!                  │   (async CRUD)   │
//!                  └────────┬─────────┘
//!                           │
//!               ┌───────────┴───────────┐
//!               ▼                       ▼
//!        ┌─────────────┐         ┌─────────────┐
//!        │   SQLite    │         │   Memory    │
//!        │ sqlite-vec  │         │ brute-force │
//!        └─────────────┘         └─────────────┘
//! ```
//!
//! The trait deliberately has no batching or retry logic; the
//! [`crate::ingestion::BatchLoader`] owns batching, ordering, and timeouts,
//! and backends only persist what they are handed.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::chunking::Chunk;
use crate::types::DocloomError;

pub use memory::MemoryVectorStore;
pub use sqlite::SqliteVectorStore;

/// A chunk in its store-facing form: content, provenance, and vector.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// Unique identifier minted at load time.
    pub id: String,
    /// Source path of the parent document.
    pub source: String,
    /// Zero-based position of the chunk within its document.
    pub chunk_index: usize,
    /// Character offset of the chunk within the document text.
    pub start_index: usize,
    /// The chunk text itself.
    pub content: String,
    /// Additional metadata as JSON.
    pub metadata: serde_json::Value,
    /// The embedding vector, when computed.
    pub embedding: Option<Vec<f32>>,
}

impl ChunkRecord {
    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        chunk_index: usize,
        start_index: usize,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            chunk_index,
            start_index,
            content: content.into(),
            metadata: serde_json::Value::Object(Default::default()),
            embedding: None,
        }
    }

    /// Builds a record from a chunk and its freshly computed embedding.
    pub fn from_chunk(chunk: &Chunk, embedding: Vec<f32>) -> Self {
        let metadata =
            serde_json::to_value(&chunk.metadata).unwrap_or(serde_json::Value::Null);
        Self {
            id: Uuid::new_v4().to_string(),
            source: chunk.metadata.source.clone(),
            chunk_index: chunk.metadata.chunk_index,
            start_index: chunk.metadata.start_index,
            content: chunk.text.clone(),
            metadata,
            embedding: Some(embedding),
        }
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    #[must_use]
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }
}

/// Unified interface over vector storage backends.
///
/// Inserts are append-only: re-ingesting the same source adds new records
/// rather than upserting. Callers that want a clean slate for a source use
/// [`delete_chunks_by_source`](VectorStore::delete_chunks_by_source) first.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Cheap connectivity probe; must not write anything.
    ///
    /// The batch loader calls this exactly once before the first batch and
    /// treats any error as fatal for the whole load.
    async fn ping(&self) -> Result<(), DocloomError>;

    /// Persists records in order. Records without embeddings are stored but
    /// unreachable through vector search.
    async fn insert_chunks(&self, records: Vec<ChunkRecord>) -> Result<(), DocloomError>;

    /// All records originating from the given source path.
    async fn get_chunks_by_source(&self, source: &str) -> Result<Vec<ChunkRecord>, DocloomError>;

    /// Removes records for a source; returns how many were deleted.
    async fn delete_chunks_by_source(&self, source: &str) -> Result<usize, DocloomError>;

    /// The `top_k` records closest to the query vector, most similar first,
    /// scored by cosine similarity.
    async fn search_similar(
        &self,
        query: &[f32],
        top_k: usize,
    ) -> Result<Vec<(ChunkRecord, f32)>, DocloomError>;

    /// Total number of stored records.
    async fn count(&self) -> Result<usize, DocloomError>;
}
