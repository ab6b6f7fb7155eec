//! Recursive character splitting with overlap and offset tracking.

use tracing::debug;

use crate::config::ChunkingConfig;
use crate::types::{DocloomError, Document};

use super::{Chunk, ChunkMetadata};

/// Splits document text into windows of at most `max_chunk_size` characters.
///
/// Window ends snap backwards to the last occurrence of the highest-priority
/// separator inside the window (paragraph before line before sentence before
/// word); when no separator is present the cut falls on a character boundary.
/// Each window after the first begins exactly `overlap` characters before the
/// previous window's end, so only chunk *ends* are approximate.
///
/// All offsets and lengths are measured in characters, not bytes, and every
/// produced chunk is a verbatim slice of the input.
#[derive(Clone, Debug)]
pub struct RecursiveCharacterSplitter {
    config: ChunkingConfig,
}

impl RecursiveCharacterSplitter {
    pub fn new(config: ChunkingConfig) -> Result<Self, DocloomError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    /// Chunks a single document, numbering chunks from zero.
    pub fn split_document(&self, document: &Document) -> Vec<Chunk> {
        let windows = self.split_text(&document.text);
        let chunks: Vec<Chunk> = windows
            .into_iter()
            .enumerate()
            .map(|(chunk_index, (start_index, text))| Chunk {
                text: text.to_string(),
                metadata: ChunkMetadata {
                    source: document.metadata.source.clone(),
                    chunk_index,
                    start_index,
                },
            })
            .collect();
        debug!(
            source = %document.metadata.source,
            chunks = chunks.len(),
            "split document"
        );
        chunks
    }

    /// Chunks documents in order, preserving provenance to each source.
    pub fn split_documents(&self, documents: &[Document]) -> Vec<Chunk> {
        documents
            .iter()
            .flat_map(|document| self.split_document(document))
            .collect()
    }

    /// Core splitting routine over `(start_char_offset, slice)` windows.
    fn split_text<'a>(&self, text: &'a str) -> Vec<(usize, &'a str)> {
        let offsets: Vec<usize> = text.char_indices().map(|(byte, _)| byte).collect();
        let char_len = offsets.len();
        if char_len == 0 {
            return Vec::new();
        }

        let byte_at = |char_pos: usize| -> usize {
            if char_pos == char_len {
                text.len()
            } else {
                offsets[char_pos]
            }
        };

        let max = self.config.max_chunk_size;
        let overlap = self.config.overlap;
        let mut windows = Vec::new();
        let mut start = 0usize;

        loop {
            let limit = (start + max).min(char_len);
            let end = if limit == char_len {
                char_len
            } else {
                self.scan_break(text, &offsets, byte_at(start), byte_at(limit))
                    .unwrap_or(limit)
            };

            windows.push((start, &text[byte_at(start)..byte_at(end)]));

            if end == char_len {
                break;
            }
            // Overlap stepping keeps exactly `overlap` shared characters; when a
            // window is too short to overlap, advance without one.
            start = if end > start + overlap { end - overlap } else { end };
        }

        windows
    }

    /// Finds the character position just past the best separator in the byte
    /// window `[window_start, window_limit)`, or `None` for a hard cut.
    fn scan_break(
        &self,
        text: &str,
        offsets: &[usize],
        window_start: usize,
        window_limit: usize,
    ) -> Option<usize> {
        let window = &text[window_start..window_limit];
        for separator in &self.config.separators {
            if separator.is_empty() {
                continue;
            }
            if let Some(found) = window.rfind(separator.as_str()) {
                let end_byte = window_start + found + separator.len();
                return Some(offsets.partition_point(|&byte| byte < end_byte));
            }
        }
        None
    }
}
