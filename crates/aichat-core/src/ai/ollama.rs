use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::read_json;
use crate::error::ProviderError;
use crate::provider::CompletionProvider;
use crate::state::ChatMessage;

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

#[derive(Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

#[derive(Deserialize)]
struct OllamaChatMessage {
    content: String,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    message: OllamaChatMessage,
}

#[derive(Deserialize)]
struct OllamaModel {
    name: String,
}

#[derive(Deserialize)]
struct OllamaModelsResponse {
    models: Vec<OllamaModel>,
}

#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
}

impl OllamaClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self.client.get(&url).send().await?;
        let models_response: OllamaModelsResponse = read_json("Ollama", response).await?;

        Ok(models_response
            .models
            .into_iter()
            .map(|model| model.name)
            .collect())
    }
}

#[async_trait]
impl CompletionProvider for OllamaClient {
    async fn complete(&self, model: &str, messages: &[ChatMessage]) -> Result<String, ProviderError> {
        let url = format!("{}/api/chat", self.base_url);

        let request = OllamaChatRequest {
            model,
            messages,
            stream: false,
        };

        let response = self.client.post(&url).json(&request).send().await?;
        let chat_response: OllamaChatResponse = read_json("Ollama", response).await?;

        if chat_response.message.content.is_empty() {
            return Err(ProviderError::EmptyCompletion);
        }
        Ok(chat_response.message.content)
    }

    fn name(&self) -> &'static str {
        "ollama"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_complete_sends_messages_and_reads_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_partial_json(serde_json::json!({
                "model": "llama3.2:latest",
                "stream": false,
                "messages": [{ "role": "user", "content": "Hello" }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "message": { "role": "assistant", "content": "Hi there" },
                "done": true
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = OllamaClient::new(&server.uri());
        let reply = client
            .complete("llama3.2:latest", &[ChatMessage::user("Hello")])
            .await
            .unwrap();
        assert_eq!(reply, "Hi there");
    }

    #[tokio::test]
    async fn test_complete_reports_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(404).set_body_string("model not found"))
            .mount(&server)
            .await;

        let client = OllamaClient::new(&server.uri());
        let err = client
            .complete("missing", &[ChatMessage::user("Hello")])
            .await
            .unwrap_err();
        match err {
            ProviderError::Status { status, body, .. } => {
                assert_eq!(status.as_u16(), 404);
                assert_eq!(body, "model not found");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_complete_reports_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = OllamaClient::new(&server.uri());
        let err = client
            .complete("llama3.2:latest", &[ChatMessage::user("Hello")])
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Malformed(_)));
    }

    #[tokio::test]
    async fn test_list_models() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "models": [{ "name": "llama3.2:latest" }, { "name": "gemma3:latest" }]
            })))
            .mount(&server)
            .await;

        let client = OllamaClient::new(&format!("{}/", server.uri()));
        let models = client.list_models().await.unwrap();
        assert_eq!(models, vec!["llama3.2:latest", "gemma3:latest"]);
    }
}
