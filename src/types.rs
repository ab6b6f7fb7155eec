//! Crate-wide error type and the extracted-document model.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Error taxonomy for the ingestion pipeline and its collaborators.
///
/// Stage failures propagate unhandled to the caller; partial progress is
/// reported through [`crate::ingestion::IngestionReport`] rather than by
/// downgrading errors.
#[derive(Debug, thiserror::Error)]
pub enum DocloomError {
    /// A configuration value was rejected before any work started.
    #[error("configuration error: {0}")]
    Config(String),

    /// A single input file could not be parsed into a document.
    #[error("unable to parse {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    /// The backing store failed its pre-flight connectivity check.
    #[error("store connectivity check failed for {target}: {reason}")]
    Connectivity { target: String, reason: String },

    /// The embedding capability returned an error or a malformed response.
    #[error("embedding request failed: {0}")]
    Embedding(String),

    /// A vector store read or write failed.
    #[error("vector store operation failed: {0}")]
    Storage(String),

    /// An external call exceeded its configured deadline.
    #[error("{operation} timed out after {timeout_ms} ms")]
    Timeout {
        operation: &'static str,
        timeout_ms: u64,
    },

    /// The chat model returned an error or a malformed response.
    #[error("chat completion failed: {0}")]
    Chat(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Unit of extracted content: one per staged file.
///
/// Documents are produced by a [`crate::loaders::DocumentLoader`] and are
/// immutable until handed to the chunker. Text is guaranteed non-empty for
/// successfully parsed files; an extraction that yields no text is a
/// [`DocloomError::Parse`], never a silent empty document.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Document {
    pub text: String,
    pub metadata: DocumentMetadata,
}

impl Document {
    pub fn new(text: impl Into<String>, metadata: DocumentMetadata) -> Self {
        Self {
            text: text.into(),
            metadata,
        }
    }
}

/// Source metadata carried from the staged file into every derived chunk.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Path of the staged file this document was extracted from.
    pub source: String,
    /// Page count, where the source format has pages.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u32>,
}

impl DocumentMetadata {
    pub fn for_source(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            page_count: None,
        }
    }

    #[must_use]
    pub fn with_page_count(mut self, pages: u32) -> Self {
        self.page_count = Some(pages);
        self
    }
}
