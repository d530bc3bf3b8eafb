//! siteqa-llm
//!
//! Text generators over HTTP chat APIs. Both query expansion and answer
//! synthesis go through the [`Generator`] trait; nothing here knows about
//! prompts.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use siteqa_core::config::{LlmProvider, LlmSettings};
use siteqa_core::traits::Generator;

#[derive(Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

impl Message {
    fn user(content: &str) -> Self { Self { role: "user".to_string(), content: content.to_string() } }
}

// ─── Ollama ──────────────────────────────────────────────

#[derive(Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    message: Message,
}

pub struct OllamaGenerator {
    client: reqwest::Client,
    base_url: String,
    model: String,
    temperature: f32,
}

impl OllamaGenerator {
    pub fn new(client: reqwest::Client, base_url: &str, model: &str, temperature: f32) -> Self {
        Self { client, base_url: base_url.trim_end_matches('/').to_string(), model: model.to_string(), temperature }
    }
}

#[async_trait]
impl Generator for OllamaGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/api/chat", self.base_url);
        let req = OllamaChatRequest {
            model: &self.model,
            messages: vec![Message::user(prompt)],
            stream: false,
            options: OllamaOptions { temperature: self.temperature },
        };
        let resp = self.client.post(&url).json(&req).send().await.context("Failed to call Ollama chat API")?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Ollama chat API returned {status}: {body}");
        }
        let body: OllamaChatResponse = resp.json().await.context("Malformed Ollama chat response")?;
        debug!(model = %self.model, chars = body.message.content.len(), "ollama generation");
        Ok(body.message.content)
    }
}

// ─── OpenAI-compatible ───────────────────────────────────

#[derive(Serialize)]
struct OpenAiChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message>,
    temperature: f32,
}

#[derive(Deserialize)]
struct OpenAiChatResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
}

#[derive(Deserialize)]
struct OpenAiResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct OpenAiGenerator {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    temperature: f32,
}

impl OpenAiGenerator {
    pub fn new(client: reqwest::Client, base_url: &str, model: &str, api_key: Option<String>, temperature: f32) -> Self {
        Self { client, base_url: base_url.trim_end_matches('/').to_string(), model: model.to_string(), api_key, temperature }
    }
}

#[async_trait]
impl Generator for OpenAiGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let req = OpenAiChatRequest { model: &self.model, messages: vec![Message::user(prompt)], temperature: self.temperature };
        let mut builder = self.client.post(&url).json(&req);
        if let Some(key) = self.api_key.as_deref().filter(|k| !k.is_empty()) {
            builder = builder.bearer_auth(key);
        }
        let resp = builder.send().await.context("Failed to call OpenAI chat API")?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("OpenAI chat API returned {status}: {body}");
        }
        let body: OpenAiChatResponse = resp.json().await.context("Malformed OpenAI chat response")?;
        let content = body.choices.into_iter().next().and_then(|c| c.message.content).unwrap_or_default();
        debug!(model = %self.model, chars = content.len(), "openai generation");
        Ok(content)
    }
}

/// Builds the configured generator. `timeout` bounds every HTTP request.
pub fn build_generator(settings: &LlmSettings, timeout: Duration) -> Result<Arc<dyn Generator>> {
    let client = reqwest::Client::builder().timeout(timeout).build().context("Failed to build HTTP client")?;
    Ok(match settings.provider {
        LlmProvider::Ollama => Arc::new(OllamaGenerator::new(client, &settings.base_url, &settings.model, settings.temperature)),
        LlmProvider::OpenAi => {
            let key = settings.api_key.clone().or_else(|| std::env::var("OPENAI_API_KEY").ok());
            Arc::new(OpenAiGenerator::new(client, &settings.base_url, &settings.model, key, settings.temperature))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let g = OllamaGenerator::new(reqwest::Client::new(), "http://localhost:11434/", "m", 0.0);
        assert_eq!(g.base_url, "http://localhost:11434");
    }

    #[test]
    fn openai_null_content_is_empty() {
        let body: OpenAiChatResponse = serde_json::from_str(r#"{"choices":[{"message":{"content":null}}]}"#).unwrap();
        assert!(body.choices[0].message.content.is_none());
    }
}
