//! ```text
//! Staging directory ──► loaders::LoaderRegistry ──────► Document
//!                                 │
//!                                 └─► text / pdf / html loaders
//!
//! Document ──► chunking::RecursiveCharacterSplitter ──► Chunk
//!
//! Chunk ──► ingestion::BatchLoader ─┬─► embeddings::EmbeddingProvider
//!                                   └─► stores::VectorStore
//!
//! Stored vectors ──► retrieval::Retriever ──► llm::ChatModel ──► answers
//! ```
//!
pub mod chunking;
pub mod config;
pub mod embeddings;
pub mod ingestion;
pub mod llm;
pub mod loaders;
pub mod retrieval;
pub mod stores;
pub mod types;

pub use chunking::{Chunk, ChunkMetadata, RecursiveCharacterSplitter};
pub use config::{ChunkingConfig, LoadConfig, ParseFailurePolicy, PipelineConfig, StoreConfig};
pub use ingestion::{BatchLoader, IngestionReport, LoadReport, Pipeline};
pub use loaders::{DocumentLoader, ExtractOutcome, LoaderRegistry, ParseFailure};
pub use types::{DocloomError, Document, DocumentMetadata};
