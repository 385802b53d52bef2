//! Google Gemini provider (primary).
//!
//! Calls `models/{model}:generateContent`. Gemini gets no separate system
//! role here: the instruction is prepended to the user turn as plain text.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{ChatProvider, ProviderError, check_status, http_client, non_empty};
use crate::config::ProviderConfig;

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

/// Gemini `generateContent` client.
#[derive(Debug, Clone)]
pub struct GeminiProvider {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl GeminiProvider {
    pub fn new(config: &ProviderConfig, timeout: Duration) -> Result<Self, ProviderError> {
        Ok(Self {
            client: http_client(timeout)?,
            endpoint: format!(
                "{}/models/{}:generateContent",
                config.base_url.trim_end_matches('/'),
                config.model
            ),
            api_key: config.api_key.clone(),
        })
    }
}

/// The single text turn Gemini receives.
pub fn compose_prompt(instruction: &str, message: &str) -> String {
    format!("{instruction}\n\nUser question: {message}\n\nProvide a clear, natural response:")
}

/// Concatenate the text parts of the first candidate.
fn extract_text(resp: GenerateResponse) -> Result<String, ProviderError> {
    let Some(candidate) = resp.candidates.into_iter().next() else {
        return Err(match resp.prompt_feedback.and_then(|f| f.block_reason) {
            Some(reason) => ProviderError::Malformed(format!("prompt blocked: {reason}")),
            None => ProviderError::Malformed("response has no candidates".into()),
        });
    };

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty()
        && let Some(reason) = candidate.finish_reason
        && reason != "STOP"
    {
        return Err(ProviderError::Malformed(format!(
            "candidate finished without text: {reason}"
        )));
    }

    non_empty(text)
}

#[async_trait]
impl ChatProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(&self, instruction: &str, message: &str) -> Result<String, ProviderError> {
        let prompt = compose_prompt(instruction, message);
        let resp = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&GenerateRequest {
                contents: [Content {
                    role: "user",
                    parts: [Part { text: &prompt }],
                }],
            })
            .send()
            .await?;

        let body: GenerateResponse = check_status(resp).await?.json().await?;
        extract_text(body)
    }
}
