//! Document loaders and the extension-keyed registry.
//!
//! Each supported format is one [`DocumentLoader`] implementation; the
//! [`LoaderRegistry`] dispatches on lowercase file extension, so adding a
//! format is an additive change (register another loader) rather than a new
//! branch in the extract stage.

pub mod html;
pub mod pdf;
pub mod text;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::ParseFailurePolicy;
use crate::types::{DocloomError, Document};

pub use html::HtmlLoader;
pub use pdf::PdfLoader;
pub use text::TextLoader;

/// Parses one file format into a [`Document`].
#[async_trait]
pub trait DocumentLoader: Send + Sync {
    /// Lowercase extensions (without the dot) this loader handles.
    fn extensions(&self) -> &[&str];

    /// Extracts one document from the file at `path`.
    ///
    /// Implementations report unreadable or malformed input as
    /// [`DocloomError::Parse`] for that single file.
    async fn load(&self, path: &Path) -> Result<Document, DocloomError>;
}

/// A staged file that could not be parsed, kept for reporting.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ParseFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// Result of extracting a staging directory.
#[derive(Clone, Debug, Default)]
pub struct ExtractOutcome {
    /// Documents in directory traversal order.
    pub documents: Vec<Document>,
    /// Files skipped under [`ParseFailurePolicy::SkipAndReport`].
    pub failures: Vec<ParseFailure>,
}

/// Extension-keyed dispatch over registered loaders.
pub struct LoaderRegistry {
    by_extension: HashMap<String, Arc<dyn DocumentLoader>>,
}

impl LoaderRegistry {
    /// An empty registry; nothing is loadable until formats are registered.
    pub fn new() -> Self {
        Self {
            by_extension: HashMap::new(),
        }
    }

    /// Registry with the stock formats: plain text and PDF.
    ///
    /// [`HtmlLoader`] ships with the crate but is not registered here;
    /// register it explicitly where HTML staging is expected.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(TextLoader::new());
        registry.register(PdfLoader::new());
        registry
    }

    /// Registers a loader for every extension it declares.
    ///
    /// A later registration for the same extension replaces the earlier one.
    pub fn register<L: DocumentLoader + 'static>(&mut self, loader: L) {
        let loader: Arc<dyn DocumentLoader> = Arc::new(loader);
        for extension in loader.extensions() {
            self.by_extension
                .insert(extension.to_ascii_lowercase(), Arc::clone(&loader));
        }
    }

    /// Looks up the loader responsible for `path`, if any.
    pub fn loader_for(&self, path: &Path) -> Option<Arc<dyn DocumentLoader>> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        self.by_extension.get(&extension).cloned()
    }

    /// Recursively extracts every supported file under `dir`.
    ///
    /// Files with unregistered extensions are skipped silently; parse
    /// failures follow `policy`. The returned documents keep directory
    /// traversal order, which is not guaranteed stable across filesystems.
    pub async fn load_dir(
        &self,
        dir: &Path,
        policy: ParseFailurePolicy,
    ) -> Result<ExtractOutcome, DocloomError> {
        let mut outcome = ExtractOutcome::default();

        for entry in WalkDir::new(dir) {
            let entry = entry.map_err(|err| DocloomError::Parse {
                path: dir.to_path_buf(),
                reason: err.to_string(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let Some(loader) = self.loader_for(path) else {
                debug!(path = %path.display(), "skipping unsupported extension");
                continue;
            };

            match self.load_checked(loader.as_ref(), path).await {
                Ok(document) => outcome.documents.push(document),
                Err(err) => match policy {
                    ParseFailurePolicy::Abort => return Err(err),
                    ParseFailurePolicy::SkipAndReport => {
                        warn!(path = %path.display(), error = %err, "skipping unparseable file");
                        outcome.failures.push(ParseFailure {
                            path: path.to_path_buf(),
                            reason: err.to_string(),
                        });
                    }
                },
            }
        }

        info!(
            documents = outcome.documents.len(),
            failures = outcome.failures.len(),
            dir = %dir.display(),
            "extracted staging directory"
        );
        Ok(outcome)
    }

    /// Runs a loader and rejects extractions that produce no text, so a
    /// corrupt file can never pass through as a silent empty document.
    async fn load_checked(
        &self,
        loader: &dyn DocumentLoader,
        path: &Path,
    ) -> Result<Document, DocloomError> {
        let document = loader.load(path).await?;
        if document.text.trim().is_empty() {
            return Err(DocloomError::Parse {
                path: path.to_path_buf(),
                reason: "extraction produced no text".into(),
            });
        }
        Ok(document)
    }
}

impl Default for LoaderRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn unsupported_extensions_are_skipped_not_errors() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "alpha document").unwrap();
        std::fs::write(dir.path().join("b.txt"), "beta document").unwrap();
        std::fs::write(dir.path().join("c.md"), "# not registered").unwrap();

        let registry = LoaderRegistry::with_defaults();
        let outcome = registry
            .load_dir(dir.path(), ParseFailurePolicy::SkipAndReport)
            .await
            .unwrap();

        assert_eq!(outcome.documents.len(), 2);
        assert!(outcome.failures.is_empty());
    }

    #[tokio::test]
    async fn nested_directories_are_walked() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("inner").join("deeper");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join("deep.txt"), "buried content").unwrap();

        let registry = LoaderRegistry::with_defaults();
        let outcome = registry
            .load_dir(dir.path(), ParseFailurePolicy::SkipAndReport)
            .await
            .unwrap();

        assert_eq!(outcome.documents.len(), 1);
        assert!(outcome.documents[0].metadata.source.ends_with("deep.txt"));
    }

    #[tokio::test]
    async fn empty_file_is_reported_as_parse_failure() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("empty.txt"), "").unwrap();
        std::fs::write(dir.path().join("ok.txt"), "has content").unwrap();

        let registry = LoaderRegistry::with_defaults();
        let outcome = registry
            .load_dir(dir.path(), ParseFailurePolicy::SkipAndReport)
            .await
            .unwrap();

        assert_eq!(outcome.documents.len(), 1);
        assert_eq!(outcome.failures.len(), 1);
        assert!(outcome.failures[0].path.ends_with("empty.txt"));
    }

    #[tokio::test]
    async fn abort_policy_stops_at_first_failure() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("bad.pdf"), "this is not a pdf").unwrap();

        let registry = LoaderRegistry::with_defaults();
        let result = registry
            .load_dir(dir.path(), ParseFailurePolicy::Abort)
            .await;

        assert!(matches!(result, Err(DocloomError::Parse { .. })));
    }

    #[tokio::test]
    async fn later_registration_replaces_earlier_for_same_extension() {
        struct Uppercase;

        #[async_trait]
        impl DocumentLoader for Uppercase {
            fn extensions(&self) -> &[&str] {
                &["txt"]
            }

            async fn load(&self, path: &Path) -> Result<Document, DocloomError> {
                let text = tokio::fs::read_to_string(path).await?;
                Ok(Document::new(
                    text.to_uppercase(),
                    crate::types::DocumentMetadata::for_source(path.display().to_string()),
                ))
            }
        }

        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "quiet").unwrap();

        let mut registry = LoaderRegistry::with_defaults();
        registry.register(Uppercase);
        let outcome = registry
            .load_dir(dir.path(), ParseFailurePolicy::Abort)
            .await
            .unwrap();

        assert_eq!(outcome.documents[0].text, "QUIET");
    }
}
