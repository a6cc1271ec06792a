use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::read_json;
use crate::error::ProviderError;
use crate::provider::CompletionProvider;
use crate::state::ChatMessage;

pub const OPENAI_API_URL: &str = "https://api.openai.com";

#[derive(Serialize)]
struct OpenAIRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Deserialize)]
struct OpenAIResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Clone)]
pub struct OpenAIClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAIClient {
    pub fn new(api_key: &str, base_url: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl CompletionProvider for OpenAIClient {
    async fn complete(&self, model: &str, messages: &[ChatMessage]) -> Result<String, ProviderError> {
        let request = OpenAIRequest { model, messages };

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let openai_response: OpenAIResponse = read_json("OpenAI", response).await?;
        openai_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|content| !content.is_empty())
            .ok_or(ProviderError::EmptyCompletion)
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_complete_posts_single_user_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(serde_json::json!({
                "model": "gpt-4o",
                "messages": [{ "role": "user", "content": "Hello" }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{ "message": { "role": "assistant", "content": "Hi there" } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = OpenAIClient::new("sk-test", &server.uri());
        let reply = client
            .complete("gpt-4o", &[ChatMessage::user("Hello")])
            .await
            .unwrap();
        assert_eq!(reply, "Hi there");
    }

    #[tokio::test]
    async fn test_unauthorized_is_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .mount(&server)
            .await;

        let client = OpenAIClient::new("bad", &server.uri());
        let err = client
            .complete("gpt-4o", &[ChatMessage::user("Hello")])
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Status { status, .. } if status.as_u16() == 401));
    }
}
