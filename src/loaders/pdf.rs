//! PDF loader built on `pdf-extract`.

use std::path::Path;

use async_trait::async_trait;

use crate::types::{DocloomError, Document, DocumentMetadata};

use super::DocumentLoader;

/// Extracts the text of every parseable page into one document per file.
///
/// `pdf-extract` is synchronous, so parsing runs on the blocking pool.
#[derive(Clone, Copy, Debug, Default)]
pub struct PdfLoader;

impl PdfLoader {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DocumentLoader for PdfLoader {
    fn extensions(&self) -> &[&str] {
        &["pdf"]
    }

    async fn load(&self, path: &Path) -> Result<Document, DocloomError> {
        let parse_error = |reason: String| DocloomError::Parse {
            path: path.to_path_buf(),
            reason,
        };

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|err| parse_error(err.to_string()))?;

        let text = tokio::task::spawn_blocking(move || {
            pdf_extract::extract_text_from_mem(&bytes).map_err(|err| err.to_string())
        })
        .await
        .map_err(|err| parse_error(format!("extraction task failed: {err}")))?
        .map_err(parse_error)?;

        let metadata = DocumentMetadata::for_source(path.display().to_string())
            .with_page_count(estimate_page_count(&text));
        Ok(Document::new(text, metadata))
    }
}

/// Counts form-feed page breaks, falling back to a single page.
fn estimate_page_count(text: &str) -> u32 {
    let form_feeds = text.matches('\x0C').count();
    form_feeds as u32 + 1
}
