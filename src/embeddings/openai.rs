//! OpenAI-compatible embedding client.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::DocloomError;

use super::EmbeddingProvider;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_DIMENSIONS: usize = 1536;

/// Calls an OpenAI-compatible `/embeddings` endpoint over HTTPS.
///
/// The base URL is overridable so tests can point the provider at a local
/// mock server.
pub struct OpenAiEmbeddingProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    dimensions: usize,
}

impl OpenAiEmbeddingProvider {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: model.into(),
            dimensions: DEFAULT_DIMENSIONS,
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    #[must_use]
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = dimensions;
        self
    }

    #[must_use]
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }
}

#[derive(Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    index: usize,
    embedding: Vec<f32>,
}

#[async_trait::async_trait]
impl EmbeddingProvider for OpenAiEmbeddingProvider {
    fn id(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, DocloomError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/embeddings", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingsRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DocloomError::Embedding(format!(
                "{url} returned {status}: {body}"
            )));
        }

        let mut payload: EmbeddingsResponse = response.json().await?;
        if payload.data.len() != texts.len() {
            return Err(DocloomError::Embedding(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                payload.data.len()
            )));
        }
        // The API documents order-by-index; sort rather than trust it.
        payload.data.sort_by_key(|item| item.index);

        debug!(model = %self.model, batch = texts.len(), "embedded batch");
        Ok(payload.data.into_iter().map(|item| item.embedding).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn posts_batch_and_returns_vectors_in_index_order() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/embeddings")
                .header("authorization", "Bearer test-key")
                .json_body_partial(r#"{"model": "text-embedding-3-small"}"#);
            then.status(200).json_body(serde_json::json!({
                "object": "list",
                "data": [
                    {"object": "embedding", "index": 1, "embedding": [0.3, 0.4]},
                    {"object": "embedding", "index": 0, "embedding": [0.1, 0.2]}
                ],
                "model": "text-embedding-3-small"
            }));
        });

        let provider = OpenAiEmbeddingProvider::new("test-key", "text-embedding-3-small")
            .with_base_url(server.base_url())
            .with_dimensions(2);

        let vectors = provider
            .embed_batch(&["first".to_string(), "second".to_string()])
            .await
            .unwrap();

        mock.assert();
        assert_eq!(vectors, vec![vec![0.1, 0.2], vec![0.3, 0.4]]);
    }

    #[tokio::test]
    async fn non_success_status_is_an_embedding_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/embeddings");
            then.status(429).body("rate limited");
        });

        let provider = OpenAiEmbeddingProvider::new("test-key", "text-embedding-3-small")
            .with_base_url(server.base_url());

        let result = provider.embed_batch(&["text".to_string()]).await;
        assert!(matches!(result, Err(DocloomError::Embedding(_))));
    }

    #[tokio::test]
    async fn count_mismatch_is_rejected() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/embeddings");
            then.status(200).json_body(serde_json::json!({
                "object": "list",
                "data": [
                    {"object": "embedding", "index": 0, "embedding": [0.5]}
                ]
            }));
        });

        let provider = OpenAiEmbeddingProvider::new("test-key", "text-embedding-3-small")
            .with_base_url(server.base_url());

        let result = provider
            .embed_batch(&["one".to_string(), "two".to_string()])
            .await;
        assert!(matches!(result, Err(DocloomError::Embedding(_))));
    }

    #[tokio::test]
    async fn empty_batch_makes_no_request() {
        let provider = OpenAiEmbeddingProvider::new("test-key", "text-embedding-3-small")
            .with_base_url("http://127.0.0.1:9"); // nothing listens here
        let vectors = provider.embed_batch(&[]).await.unwrap();
        assert!(vectors.is_empty());
    }
}
