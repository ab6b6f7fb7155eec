//! Explicit configuration for every pipeline component.
//!
//! Nothing in the library reads process environment; components receive these
//! structs through their constructors. Demo binaries translate environment
//! variables into configs at the edge.

use std::time::Duration;

use crate::types::DocloomError;

/// Default ceiling on chunk length, in characters.
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 1000;
/// Default overlap between consecutive chunks, in characters.
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;
/// Default number of chunks embedded and written per store call.
pub const DEFAULT_BATCH_SIZE: usize = 100;
/// Default deadline applied to each external call.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Controls for [`crate::chunking::RecursiveCharacterSplitter`].
#[derive(Clone, Debug)]
pub struct ChunkingConfig {
    /// Maximum chunk length in characters.
    pub max_chunk_size: usize,
    /// Characters of trailing text repeated at the start of the next chunk.
    pub overlap: usize,
    /// Break candidates in priority order; an empty list means hard cuts only.
    pub separators: Vec<String>,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
            separators: default_separators(),
        }
    }
}

impl ChunkingConfig {
    /// Rejects configurations the splitter cannot make progress with.
    pub fn validate(&self) -> Result<(), DocloomError> {
        if self.max_chunk_size == 0 {
            return Err(DocloomError::Config(
                "max_chunk_size must be at least 1".into(),
            ));
        }
        if self.overlap >= self.max_chunk_size {
            return Err(DocloomError::Config(format!(
                "overlap ({}) must be smaller than max_chunk_size ({})",
                self.overlap, self.max_chunk_size
            )));
        }
        Ok(())
    }
}

/// Paragraph, then line, then sentence, then word boundaries.
pub fn default_separators() -> Vec<String> {
    vec!["\n\n".into(), "\n".into(), ". ".into(), " ".into()]
}

/// Controls for [`crate::ingestion::BatchLoader`].
#[derive(Clone, Debug)]
pub struct LoadConfig {
    /// Upper bound on chunks per embed-and-write cycle.
    pub batch_size: usize,
    /// Deadline for each embedding call, store write, and connectivity check.
    pub call_timeout: Duration,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }
}

impl LoadConfig {
    pub fn validate(&self) -> Result<(), DocloomError> {
        if self.batch_size == 0 {
            return Err(DocloomError::Config("batch_size must be at least 1".into()));
        }
        Ok(())
    }
}

/// Addressing for a vector store collection.
#[derive(Clone, Debug)]
pub struct StoreConfig {
    /// Backend-specific connection target (a database path for SQLite).
    pub connection_target: String,
    /// Named collection that holds one corpus's vectors.
    pub collection_name: String,
}

impl StoreConfig {
    pub fn new(
        connection_target: impl Into<String>,
        collection_name: impl Into<String>,
    ) -> Self {
        Self {
            connection_target: connection_target.into(),
            collection_name: collection_name.into(),
        }
    }
}

/// What to do when a single staged file fails to parse.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ParseFailurePolicy {
    /// Stop the extract stage at the first unparseable file.
    Abort,
    /// Skip the file, record the failure, and keep extracting.
    #[default]
    SkipAndReport,
}

/// Aggregate configuration for [`crate::ingestion::Pipeline`].
#[derive(Clone, Debug, Default)]
pub struct PipelineConfig {
    pub chunking: ChunkingConfig,
    pub load: LoadConfig,
    pub parse_failures: ParseFailurePolicy,
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), DocloomError> {
        self.chunking.validate()?;
        self.load.validate()
    }
}
