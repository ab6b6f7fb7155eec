//! End-to-end pipeline tests with the deterministic mock embedder.
//!
//! Everything here runs against the in-memory store, so assertions are exact
//! and nothing depends on the network or on SQLite.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tempfile::tempdir;

use docloom::config::{LoadConfig, PipelineConfig};
use docloom::embeddings::MockEmbeddingProvider;
use docloom::ingestion::Pipeline;
use docloom::stores::{ChunkRecord, MemoryVectorStore, VectorStore};
use docloom::types::DocloomError;

/// Delegates to a memory store while recording the size of every insert.
#[derive(Default)]
struct RecordingStore {
    inner: MemoryVectorStore,
    batch_sizes: Mutex<Vec<usize>>,
}

impl RecordingStore {
    fn batch_sizes(&self) -> Vec<usize> {
        self.batch_sizes.lock().clone()
    }
}

#[async_trait]
impl VectorStore for RecordingStore {
    async fn ping(&self) -> Result<(), DocloomError> {
        self.inner.ping().await
    }

    async fn insert_chunks(&self, records: Vec<ChunkRecord>) -> Result<(), DocloomError> {
        self.batch_sizes.lock().push(records.len());
        self.inner.insert_chunks(records).await
    }

    async fn get_chunks_by_source(&self, source: &str) -> Result<Vec<ChunkRecord>, DocloomError> {
        self.inner.get_chunks_by_source(source).await
    }

    async fn delete_chunks_by_source(&self, source: &str) -> Result<usize, DocloomError> {
        self.inner.delete_chunks_by_source(source).await
    }

    async fn search_similar(
        &self,
        query: &[f32],
        top_k: usize,
    ) -> Result<Vec<(ChunkRecord, f32)>, DocloomError> {
        self.inner.search_similar(query, top_k).await
    }

    async fn count(&self) -> Result<usize, DocloomError> {
        self.inner.count().await
    }
}

/// A store whose connectivity check always fails.
#[derive(Default)]
struct UnreachableStore {
    writes: AtomicUsize,
}

#[async_trait]
impl VectorStore for UnreachableStore {
    async fn ping(&self) -> Result<(), DocloomError> {
        Err(DocloomError::Connectivity {
            target: "postgres://db.invalid/vector_db".into(),
            reason: "connection refused".into(),
        })
    }

    async fn insert_chunks(&self, _records: Vec<ChunkRecord>) -> Result<(), DocloomError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn get_chunks_by_source(&self, _source: &str) -> Result<Vec<ChunkRecord>, DocloomError> {
        Ok(Vec::new())
    }

    async fn delete_chunks_by_source(&self, _source: &str) -> Result<usize, DocloomError> {
        Ok(0)
    }

    async fn search_similar(
        &self,
        _query: &[f32],
        _top_k: usize,
    ) -> Result<Vec<(ChunkRecord, f32)>, DocloomError> {
        Ok(Vec::new())
    }

    async fn count(&self) -> Result<usize, DocloomError> {
        Ok(0)
    }
}

fn pipeline_over(
    embedder: Arc<MockEmbeddingProvider>,
    store: Arc<dyn VectorStore>,
) -> Pipeline {
    Pipeline::builder()
        .embedder(embedder)
        .store(store)
        .build()
        .unwrap()
}

/// 2500 characters built from 8-character words, so word-boundary splitting
/// lands exactly on the arithmetic chunk offsets.
fn aligned_2500_chars() -> String {
    let mut text = "word123 ".repeat(312);
    text.push_str("word");
    assert_eq!(text.chars().count(), 2500);
    text
}

fn stage(dir: &Path, name: &str, contents: &str) {
    std::fs::write(dir.join(name), contents).unwrap();
}

#[tokio::test]
async fn end_to_end_single_text_file() {
    let staging = tempdir().unwrap();
    stage(staging.path(), "report.txt", &aligned_2500_chars());

    let embedder = Arc::new(MockEmbeddingProvider::new());
    let store = Arc::new(RecordingStore::default());
    let pipeline = pipeline_over(embedder.clone(), store.clone());

    // extract: exactly one document for the one supported file.
    let outcome = pipeline.extract(staging.path()).await.unwrap();
    assert_eq!(outcome.documents.len(), 1);
    assert!(outcome.failures.is_empty());

    // transform: three chunks at the documented offsets.
    let chunks = pipeline.transform(&outcome.documents);
    let starts: Vec<usize> = chunks.iter().map(|c| c.metadata.start_index).collect();
    assert_eq!(starts, vec![0, 800, 1600]);

    // load: one batch, one embedding call.
    let load_report = pipeline.load(chunks).await.unwrap();
    assert_eq!(load_report.batches_committed, 1);
    assert_eq!(store.batch_sizes(), vec![3]);
    assert_eq!(embedder.calls(), 1);
}

#[tokio::test]
async fn run_reports_source_document_count_not_chunk_count() {
    let staging = tempdir().unwrap();
    stage(staging.path(), "report.txt", &aligned_2500_chars());

    let embedder = Arc::new(MockEmbeddingProvider::new());
    let store = Arc::new(MemoryVectorStore::new());
    let pipeline = pipeline_over(embedder, store.clone());

    let report = pipeline.run(staging.path()).await.unwrap();
    assert_eq!(report.documents_loaded, 1);
    assert_eq!(report.chunks_written, 3);
    assert_eq!(report.batches_committed, 1);
    assert_eq!(store.count().await.unwrap(), 3);
}

#[tokio::test]
async fn only_supported_extensions_are_loaded() {
    let staging = tempdir().unwrap();
    stage(staging.path(), "a.txt", "first supported file");
    stage(staging.path(), "b.txt", "second supported file");
    stage(staging.path(), "notes.md", "markdown is not registered");
    stage(staging.path(), "data.csv", "neither,is,csv");

    let embedder = Arc::new(MockEmbeddingProvider::new());
    let store = Arc::new(MemoryVectorStore::new());
    let pipeline = pipeline_over(embedder, store);

    let report = pipeline.run(staging.path()).await.unwrap();
    assert_eq!(report.documents_loaded, 2);
    assert!(report.parse_failures.is_empty());
}

#[tokio::test]
async fn chunk_invariants_hold_for_a_larger_corpus() {
    let staging = tempdir().unwrap();
    let prose = "All of these sentences are filler prose for the corpus. ".repeat(200);
    stage(staging.path(), "big.txt", &prose);

    let embedder = Arc::new(MockEmbeddingProvider::new());
    let store = Arc::new(MemoryVectorStore::new());
    let pipeline = pipeline_over(embedder, store);

    let outcome = pipeline.extract(staging.path()).await.unwrap();
    let chunks = pipeline.transform(&outcome.documents);

    assert!(chunks.len() > 3);
    for chunk in &chunks {
        assert!(chunk.char_len() <= 1000);
    }
    for pair in chunks.windows(2) {
        let prev_end = pair[0].metadata.start_index + pair[0].char_len();
        assert_eq!(
            pair[1].metadata.start_index,
            prev_end - 200,
            "adjacent chunks must share exactly the configured overlap"
        );
    }
}

#[tokio::test]
async fn batches_are_capped_with_a_partial_tail() {
    let staging = tempdir().unwrap();
    // 40 small documents, one chunk each, with batch_size lowered to 16:
    // ceil(40/16) = 3 batches sized 16, 16, 8.
    for i in 0..40 {
        stage(
            staging.path(),
            &format!("doc_{i:02}.txt"),
            &format!("standalone document number {i}"),
        );
    }

    let embedder = Arc::new(MockEmbeddingProvider::new());
    let store = Arc::new(RecordingStore::default());
    let pipeline = Pipeline::builder()
        .embedder(embedder.clone())
        .store(store.clone())
        .config(PipelineConfig {
            load: LoadConfig {
                batch_size: 16,
                ..Default::default()
            },
            ..Default::default()
        })
        .build()
        .unwrap();

    let report = pipeline.run(staging.path()).await.unwrap();
    assert_eq!(report.documents_loaded, 40);
    assert_eq!(report.batches_committed, 3);
    assert_eq!(store.batch_sizes(), vec![16, 16, 8]);
    assert_eq!(embedder.calls(), 3);
}

#[tokio::test]
async fn reingesting_the_same_corpus_appends_duplicates() {
    // Append-only by design: without a dedup key, a second run over the same
    // staging directory stores every vector again.
    let staging = tempdir().unwrap();
    stage(staging.path(), "dup.txt", "the same content both times");

    let embedder = Arc::new(MockEmbeddingProvider::new());
    let store = Arc::new(MemoryVectorStore::new());
    let pipeline = pipeline_over(embedder, store.clone());

    pipeline.run(staging.path()).await.unwrap();
    let after_first = store.count().await.unwrap();
    pipeline.run(staging.path()).await.unwrap();

    assert_eq!(store.count().await.unwrap(), after_first * 2);
}

#[tokio::test]
async fn unreachable_store_aborts_before_any_embedding_call() {
    let staging = tempdir().unwrap();
    stage(staging.path(), "doc.txt", "content that will never be embedded");

    let embedder = Arc::new(MockEmbeddingProvider::new());
    let store = Arc::new(UnreachableStore::default());
    let pipeline = pipeline_over(embedder.clone(), store.clone());

    let result = pipeline.run(staging.path()).await;

    assert!(matches!(result, Err(DocloomError::Connectivity { .. })));
    assert_eq!(embedder.calls(), 0, "no embedding call may precede the check");
    assert_eq!(store.writes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn parse_failures_are_reported_not_fatal_by_default() {
    let staging = tempdir().unwrap();
    stage(staging.path(), "good.txt", "parses fine");
    stage(staging.path(), "broken.pdf", "not really a pdf");

    let embedder = Arc::new(MockEmbeddingProvider::new());
    let store = Arc::new(MemoryVectorStore::new());
    let pipeline = pipeline_over(embedder, store);

    let report = pipeline.run(staging.path()).await.unwrap();
    assert_eq!(report.documents_loaded, 1);
    assert_eq!(report.parse_failures.len(), 1);
    assert!(report.parse_failures[0].path.ends_with("broken.pdf"));
}
