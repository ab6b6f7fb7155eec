//! Language-model capability: prompt in, answer out.
//!
//! The library takes no position on prompt construction or conversation
//! memory; callers assemble the system and user messages themselves.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::types::DocloomError;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Maps a (system, user) message pair to a completed answer.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> Result<String, DocloomError>;
}

/// Calls an OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAiChatModel {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiChatModel {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    async fn complete(&self, system: &str, user: &str) -> Result<String, DocloomError> {
        let url = format!(
            "{}/chat/completions",
            self.base_url.trim_end_matches('/')
        );
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&ChatRequest {
                model: &self.model,
                messages: vec![
                    ChatMessage {
                        role: "system",
                        content: system,
                    },
                    ChatMessage {
                        role: "user",
                        content: user,
                    },
                ],
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DocloomError::Chat(format!(
                "{url} returned {status}: {body}"
            )));
        }

        let payload: ChatResponse = response.json().await?;
        payload
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| DocloomError::Chat("response contained no choices".into()))
    }
}
