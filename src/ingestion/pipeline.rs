//! Extract → transform → load orchestration.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::chunking::{Chunk, RecursiveCharacterSplitter};
use crate::config::{ParseFailurePolicy, PipelineConfig};
use crate::embeddings::EmbeddingProvider;
use crate::loaders::{ExtractOutcome, LoaderRegistry, ParseFailure};
use crate::stores::VectorStore;
use crate::types::{DocloomError, Document};

use super::loader::{BatchLoader, LoadReport};

/// Structured result of a full ingestion run.
///
/// Distinguishes partial success (documents that failed to parse under the
/// skip-and-report policy) from the hard failures that abort the run.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct IngestionReport {
    /// Source documents successfully extracted and carried through the run.
    pub documents_loaded: usize,
    /// Files skipped by the extract stage, with reasons.
    pub parse_failures: Vec<ParseFailure>,
    /// Chunks embedded and persisted.
    pub chunks_written: usize,
    /// Store write calls that committed.
    pub batches_committed: usize,
}

/// Sequences the three ETL stages over a staging directory.
///
/// Stages never read backwards: raw files become documents, documents become
/// chunks, chunks become stored vectors. Any stage error propagates to the
/// caller unhandled, leaving the store in whatever state the load reached.
pub struct Pipeline {
    registry: LoaderRegistry,
    splitter: RecursiveCharacterSplitter,
    batch_loader: BatchLoader,
    parse_failures: ParseFailurePolicy,
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// Stage one: parse every supported file under `staging_dir`.
    pub async fn extract(&self, staging_dir: &Path) -> Result<ExtractOutcome, DocloomError> {
        self.registry.load_dir(staging_dir, self.parse_failures).await
    }

    /// Stage two: split documents into overlapping chunks.
    pub fn transform(&self, documents: &[Document]) -> Vec<Chunk> {
        let chunks = self.splitter.split_documents(documents);
        info!(
            documents = documents.len(),
            chunks = chunks.len(),
            "chunked documents"
        );
        chunks
    }

    /// Stage three: embed and persist chunks in order.
    pub async fn load(&self, chunks: Vec<Chunk>) -> Result<LoadReport, DocloomError> {
        self.batch_loader.load(chunks).await
    }

    /// Runs all three stages and reports what happened.
    ///
    /// `documents_loaded` counts source documents, not chunks.
    pub async fn run(&self, staging_dir: &Path) -> Result<IngestionReport, DocloomError> {
        let ExtractOutcome {
            documents,
            failures,
        } = self.extract(staging_dir).await?;
        let chunks = self.transform(&documents);
        let load_report = self.load(chunks).await?;

        let report = IngestionReport {
            documents_loaded: documents.len(),
            parse_failures: failures,
            chunks_written: load_report.chunks_written,
            batches_committed: load_report.batches_committed,
        };
        info!(
            documents = report.documents_loaded,
            chunks = report.chunks_written,
            batches = report.batches_committed,
            skipped = report.parse_failures.len(),
            "ingestion run complete"
        );
        Ok(report)
    }
}

/// Builder for [`Pipeline`] instances.
#[derive(Default)]
pub struct PipelineBuilder {
    registry: Option<LoaderRegistry>,
    config: Option<PipelineConfig>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    store: Option<Arc<dyn VectorStore>>,
}

impl PipelineBuilder {
    /// Override the loader registry. Defaults to
    /// [`LoaderRegistry::with_defaults`].
    #[must_use]
    pub fn registry(mut self, registry: LoaderRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Override the pipeline configuration. Defaults to
    /// [`PipelineConfig::default`].
    #[must_use]
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding capability. Required.
    #[must_use]
    pub fn embedder(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Set the vector store. Required.
    #[must_use]
    pub fn store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Build the pipeline, validating configuration up front.
    ///
    /// # Panics
    ///
    /// Panics if [`embedder`](Self::embedder) or [`store`](Self::store) was
    /// not provided. Use [`try_build`](Self::try_build) to handle the missing
    /// pieces as a value.
    pub fn build(self) -> Result<Pipeline, DocloomError> {
        let embedder = self.embedder.expect("PipelineBuilder requires an embedder");
        let store = self.store.expect("PipelineBuilder requires a store");
        Self::assemble(self.registry, self.config, embedder, store)
    }

    /// Build the pipeline, returning `None` when a required piece is missing.
    pub fn try_build(self) -> Option<Result<Pipeline, DocloomError>> {
        let embedder = self.embedder?;
        let store = self.store?;
        Some(Self::assemble(self.registry, self.config, embedder, store))
    }

    fn assemble(
        registry: Option<LoaderRegistry>,
        config: Option<PipelineConfig>,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
    ) -> Result<Pipeline, DocloomError> {
        let config = config.unwrap_or_default();
        config.validate()?;
        let splitter = RecursiveCharacterSplitter::new(config.chunking.clone())?;
        let batch_loader = BatchLoader::new(embedder, store, config.load.clone())?;
        Ok(Pipeline {
            registry: registry.unwrap_or_default(),
            splitter,
            batch_loader,
            parse_failures: config.parse_failures,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_without_collaborators_does_not_build() {
        assert!(Pipeline::builder().try_build().is_none());
    }
}
