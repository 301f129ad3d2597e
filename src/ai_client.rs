//! OpenAI chat-completions client for document summaries.

use crate::error::{FolioError, Result};
use crate::settings::Settings;
use crate::summary::Summarizer;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

const SYSTEM_PROMPT: &str = "You are a helpful assistant that creates concise summaries of documents.";

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    total_tokens: u64,
}

pub struct OpenAiSummarizer {
    client: reqwest::Client,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiSummarizer {
    pub fn new(settings: &Settings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()
            .map_err(|e| FolioError::Network(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: settings.openai_base_url.trim_end_matches('/').to_string(),
            model: settings.openai_model.clone(),
            temperature: settings.summary_temperature,
            max_tokens: settings.summary_max_tokens,
        })
    }
}

fn user_prompt(text: &str) -> String {
    format!("Please provide a concise summary of the following text:\n\n{}", text)
}

/// Strip surrounding whitespace and a markdown fence if the model added one.
fn clean_summary(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.starts_with("```") {
        return trimmed
            .lines()
            .skip(1)
            .take_while(|l| !l.starts_with("```"))
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string();
    }
    trimmed.to_string()
}

#[async_trait]
impl Summarizer for OpenAiSummarizer {
    async fn summarize(&self, credential: &str, text: &str) -> Result<String> {
        let prompt = user_prompt(text);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: SYSTEM_PROMPT },
                ChatMessage { role: "user", content: &prompt },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(credential)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| FolioError::SummaryFailed(format!("OpenAI request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(FolioError::SummaryFailed(format!("OpenAI API error {}: {}", status, body)));
        }

        let api_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| FolioError::SummaryFailed(format!("Failed to parse OpenAI response: {}", e)))?;

        if let Some(usage) = &api_response.usage {
            tracing::debug!(tokens = usage.total_tokens, model = %self.model, "OpenAI usage");
        }

        api_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| clean_summary(&c))
            .filter(|c| !c.is_empty())
            .ok_or_else(|| FolioError::SummaryFailed("No response from OpenAI".to_string()))
    }
}
