//! Plain-text loader.

use std::path::Path;

use async_trait::async_trait;

use crate::types::{DocloomError, Document, DocumentMetadata};

use super::DocumentLoader;

/// Loads `.txt` files verbatim as UTF-8.
#[derive(Clone, Copy, Debug, Default)]
pub struct TextLoader;

impl TextLoader {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DocumentLoader for TextLoader {
    fn extensions(&self) -> &[&str] {
        &["txt"]
    }

    async fn load(&self, path: &Path) -> Result<Document, DocloomError> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|err| DocloomError::Parse {
                path: path.to_path_buf(),
                reason: err.to_string(),
            })?;
        Ok(Document::new(
            text,
            DocumentMetadata::for_source(path.display().to_string()),
        ))
    }
}
