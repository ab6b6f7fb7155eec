//! Question-answering loop over a previously ingested collection.
//!
//! ```text
//! DOCLOOM_DB=./docloom.sqlite \
//! DOCLOOM_COLLECTION=documents \
//! OPENAI_API_KEY=sk-... cargo run --example chat
//! ```
//!
//! Each question is embedded, the closest chunks are fetched, and the chat
//! model answers from those passages. Without an API key the retrieved
//! passages are printed directly instead.

use std::env;
use std::io::{BufRead, Write};
use std::sync::Arc;

use tracing_subscriber::FmtSubscriber;

use docloom::config::StoreConfig;
use docloom::embeddings::{EmbeddingProvider, MockEmbeddingProvider, OpenAiEmbeddingProvider};
use docloom::llm::{ChatModel, OpenAiChatModel};
use docloom::retrieval::Retriever;
use docloom::stores::SqliteVectorStore;
use docloom::types::DocloomError;

const SYSTEM_PROMPT: &str = "Answer the question using only the provided document excerpts. \
If the excerpts do not contain the answer, say so.";

#[tokio::main]
async fn main() -> Result<(), DocloomError> {
    init_tracing();
    let _ = dotenvy::dotenv();

    let store_config = StoreConfig::new(
        env::var("DOCLOOM_DB").unwrap_or_else(|_| "./docloom.sqlite".to_string()),
        env::var("DOCLOOM_COLLECTION").unwrap_or_else(|_| "documents".to_string()),
    );
    let store = Arc::new(SqliteVectorStore::open(&store_config).await?);

    let api_key = env::var("OPENAI_API_KEY").ok();
    let embedder: Arc<dyn EmbeddingProvider> = match &api_key {
        Some(key) => Arc::new(OpenAiEmbeddingProvider::new(
            key.clone(),
            "text-embedding-3-small",
        )),
        None => {
            println!("OPENAI_API_KEY unset; using the mock embedder and echoing excerpts");
            Arc::new(MockEmbeddingProvider::new())
        }
    };
    let chat_model: Option<OpenAiChatModel> =
        api_key.map(|key| OpenAiChatModel::new(key, "gpt-4o-mini"));

    let retriever = Retriever::new(embedder, store).with_top_k(4);

    println!("What would you like to know about your documents? (empty line quits)");
    let stdin = std::io::stdin();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let mut question = String::new();
        if stdin.lock().read_line(&mut question)? == 0 {
            break;
        }
        let question = question.trim();
        if question.is_empty() {
            break;
        }

        let results = retriever.retrieve(question).await?;
        if results.is_empty() {
            println!("No stored documents matched; ingest something first.");
            continue;
        }

        match &chat_model {
            Some(model) => {
                let mut user = String::new();
                for (record, _score) in &results {
                    user.push_str("Excerpt from ");
                    user.push_str(&record.source);
                    user.push_str(":\n");
                    user.push_str(&record.content);
                    user.push_str("\n\n");
                }
                user.push_str("Question: ");
                user.push_str(question);

                let answer = model.complete(SYSTEM_PROMPT, &user).await?;
                println!("{answer}\n");
            }
            None => {
                for (record, score) in &results {
                    println!(
                        "[{:.3}] {} (chunk {} @ {})",
                        score, record.source, record.chunk_index, record.start_index
                    );
                    println!("{}\n", record.content);
                }
            }
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
