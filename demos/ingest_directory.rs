//! Ingest a staging directory into a SQLite-backed vector collection.
//!
//! ```text
//! DOCLOOM_STAGING=./to_process \
//! DOCLOOM_DB=./docloom.sqlite \
//! DOCLOOM_COLLECTION=documents \
//! OPENAI_API_KEY=sk-... cargo run --example ingest_directory
//! ```
//!
//! Without an `OPENAI_API_KEY`, embeddings come from the deterministic mock
//! provider so the pipeline stays runnable offline.

use std::env;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tracing_subscriber::FmtSubscriber;

use docloom::config::StoreConfig;
use docloom::embeddings::{EmbeddingProvider, MockEmbeddingProvider, OpenAiEmbeddingProvider};
use docloom::ingestion::Pipeline;
use docloom::loaders::{HtmlLoader, LoaderRegistry};
use docloom::stores::{SqliteVectorStore, VectorStore};
use docloom::types::DocloomError;

#[tokio::main]
async fn main() -> Result<(), DocloomError> {
    init_tracing();
    let _ = dotenvy::dotenv();

    let staging_dir = env::var("DOCLOOM_STAGING").unwrap_or_else(|_| "./to_process".to_string());
    let store_config = StoreConfig::new(
        env::var("DOCLOOM_DB").unwrap_or_else(|_| "./docloom.sqlite".to_string()),
        env::var("DOCLOOM_COLLECTION").unwrap_or_else(|_| "documents".to_string()),
    );

    let embedder: Arc<dyn EmbeddingProvider> = match env::var("OPENAI_API_KEY") {
        Ok(key) => Arc::new(OpenAiEmbeddingProvider::new(key, "text-embedding-3-small")),
        Err(_) => {
            println!("OPENAI_API_KEY unset; using the deterministic mock embedder");
            Arc::new(MockEmbeddingProvider::new())
        }
    };

    let store: Arc<dyn VectorStore> = Arc::new(SqliteVectorStore::open(&store_config).await?);

    let mut registry = LoaderRegistry::with_defaults();
    registry.register(HtmlLoader::new());

    let pipeline = Pipeline::builder()
        .registry(registry)
        .embedder(embedder)
        .store(Arc::clone(&store))
        .build()?;

    let start = Instant::now();
    let report = pipeline.run(Path::new(&staging_dir)).await?;

    println!("\nIngestion complete in {:.2?}", start.elapsed());
    println!("  documents loaded : {}", report.documents_loaded);
    println!("  chunks written   : {}", report.chunks_written);
    println!("  batches committed: {}", report.batches_committed);
    println!("  stored total     : {}", store.count().await?);
    if !report.parse_failures.is_empty() {
        println!("  skipped files    :");
        for failure in &report.parse_failures {
            println!("    {} ({})", failure.path.display(), failure.reason);
        }
    }

    Ok(())
}

fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let subscriber = FmtSubscriber::builder().with_env_filter("info").finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}
