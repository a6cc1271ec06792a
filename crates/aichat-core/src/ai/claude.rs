use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::read_json;
use crate::error::ProviderError;
use crate::provider::CompletionProvider;
use crate::state::ChatMessage;

pub const CLAUDE_API_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 4096;

#[derive(Serialize)]
struct ClaudeRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: &'a [ChatMessage],
}

#[derive(Deserialize)]
struct ClaudeContent {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct ClaudeResponse {
    content: Vec<ClaudeContent>,
}

#[derive(Clone)]
pub struct ClaudeClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl ClaudeClient {
    pub fn new(api_key: &str, base_url: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl CompletionProvider for ClaudeClient {
    async fn complete(&self, model: &str, messages: &[ChatMessage]) -> Result<String, ProviderError> {
        let request = ClaudeRequest {
            model,
            max_tokens: MAX_TOKENS,
            messages,
        };

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await?;

        let claude_response: ClaudeResponse = read_json("Claude", response).await?;
        claude_response
            .content
            .into_iter()
            .map(|c| c.text)
            .find(|text| !text.is_empty())
            .ok_or(ProviderError::EmptyCompletion)
    }

    fn name(&self) -> &'static str {
        "claude"
    }
}
