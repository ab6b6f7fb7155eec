//! HTML loader built on `scraper`.
//!
//! Not part of [`super::LoaderRegistry::with_defaults`]; register it where
//! HTML staging is expected:
//!
//! ```rust,ignore
//! let mut registry = LoaderRegistry::with_defaults();
//! registry.register(HtmlLoader::new());
//! ```

use std::path::Path;

use async_trait::async_trait;
use scraper::{ElementRef, Html};

use crate::types::{DocloomError, Document, DocumentMetadata};

use super::DocumentLoader;

/// Strips markup from `.html`/`.htm` files and keeps the visible text.
#[derive(Clone, Copy, Debug, Default)]
pub struct HtmlLoader;

impl HtmlLoader {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DocumentLoader for HtmlLoader {
    fn extensions(&self) -> &[&str] {
        &["html", "htm"]
    }

    async fn load(&self, path: &Path) -> Result<Document, DocloomError> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|err| DocloomError::Parse {
                path: path.to_path_buf(),
                reason: err.to_string(),
            })?;

        Ok(Document::new(
            visible_text(&raw),
            DocumentMetadata::for_source(path.display().to_string()),
        ))
    }
}

/// Collects text nodes outside of script/style, collapsing runs of whitespace.
fn visible_text(raw: &str) -> String {
    let document = Html::parse_document(raw);
    let mut words: Vec<&str> = Vec::new();
    collect_text(document.root_element(), &mut words);
    words.join(" ")
}

fn collect_text<'a>(element: ElementRef<'a>, words: &mut Vec<&'a str>) {
    if matches!(element.value().name(), "script" | "style") {
        return;
    }
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            words.extend(text.split_whitespace());
        } else if let Some(child_element) = ElementRef::wrap(child) {
            collect_text(child_element, words);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn markup_is_stripped_and_whitespace_collapsed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("page.html");
        std::fs::write(
            &path,
            "<html><body><h1>Title</h1>\n  <p>First   paragraph.</p></body></html>",
        )
        .unwrap();

        let document = HtmlLoader::new().load(&path).await.unwrap();
        assert_eq!(document.text, "Title First paragraph.");
    }

    #[tokio::test]
    async fn script_and_style_bodies_are_dropped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("page.html");
        std::fs::write(
            &path,
            "<html><head><style>body { color: red; }</style></head>\
             <body><script>var hidden = 1;</script><p>Visible words</p></body></html>",
        )
        .unwrap();

        let document = HtmlLoader::new().load(&path).await.unwrap();
        assert_eq!(document.text, "Visible words");
    }
}
