//! Mistral provider (secondary).
//!
//! OpenAI-style chat completions: the instruction travels as its own
//! `system` message ahead of the `user` message.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{ChatProvider, ProviderError, check_status, http_client, non_empty};
use crate::config::ProviderConfig;

#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct ChatMessage<'a> {
    pub role: &'static str,
    pub content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<MessageContent>,
}

/// Mistral answers with a plain string, or with typed chunks on some models.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Chunks(Vec<ContentChunk>),
}

#[derive(Debug, Deserialize)]
struct ContentChunk {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

/// Mistral chat completions client.
#[derive(Debug, Clone)]
pub struct MistralProvider {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl MistralProvider {
    pub fn new(config: &ProviderConfig, timeout: Duration) -> Result<Self, ProviderError> {
        Ok(Self {
            client: http_client(timeout)?,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

/// System turn followed by the user turn.
pub fn build_messages<'a>(instruction: &'a str, message: &'a str) -> Vec<ChatMessage<'a>> {
    vec![
        ChatMessage {
            role: "system",
            content: instruction,
        },
        ChatMessage {
            role: "user",
            content: message,
        },
    ]
}

fn extract_text(resp: ChatResponse) -> Result<String, ProviderError> {
    let choice = resp
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::Malformed("response has no choices".into()))?;

    let text = match choice.message.content {
        Some(MessageContent::Text(text)) => text,
        Some(MessageContent::Chunks(chunks)) => chunks
            .into_iter()
            .filter(|c| c.kind == "text")
            .filter_map(|c| c.text)
            .collect(),
        None => return Err(ProviderError::Empty),
    };

    non_empty(text)
}

#[async_trait]
impl ChatProvider for MistralProvider {
    fn name(&self) -> &str {
        "mistral"
    }

    async fn generate(&self, instruction: &str, message: &str) -> Result<String, ProviderError> {
        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&ChatRequest {
                model: &self.model,
                messages: build_messages(instruction, message),
            })
            .send()
            .await?;

        let body: ChatResponse = check_status(resp).await?.json().await?;
        extract_text(body)
    }
}
