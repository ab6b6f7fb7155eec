//! Splitting extracted documents into overlapping, traceable chunks.

pub mod splitter;

use serde::{Deserialize, Serialize};

pub use splitter::RecursiveCharacterSplitter;

/// A bounded-length segment of a document's text.
///
/// Chunk text is always a verbatim slice of the parent document, so
/// `document.text[start_index..]` begins with `chunk.text` when offsets are
/// measured in characters.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub metadata: ChunkMetadata,
}

/// Provenance carried by every chunk.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Source path inherited from the parent document.
    pub source: String,
    /// Zero-based position of this chunk within its document.
    pub chunk_index: usize,
    /// Character offset of the chunk's first character in the document text.
    pub start_index: usize,
}

impl Chunk {
    /// Character length of the chunk text.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}
