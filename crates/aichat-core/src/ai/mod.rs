pub mod claude;
pub mod ollama;
pub mod openai;

use std::sync::Arc;

use reqwest::Response;
use serde::de::DeserializeOwned;

pub use claude::ClaudeClient;
pub use ollama::OllamaClient;
pub use openai::OpenAIClient;

use crate::config::Config;
use crate::error::ProviderError;
use crate::provider::{CompletionProvider, Provider};

/// Build the client for the configured provider.
///
/// Hosted providers need an API key; Ollama only needs a base URL.
pub fn build_provider(config: &Config) -> Result<Arc<dyn CompletionProvider>, ProviderError> {
    let provider = config.selected_provider();
    let client: Arc<dyn CompletionProvider> = match provider {
        Provider::Ollama => Arc::new(OllamaClient::new(&config.base_url(Provider::Ollama))),
        Provider::Claude => {
            let key = config
                .api_key(Provider::Claude)
                .ok_or(ProviderError::NotConfigured(Provider::Claude))?;
            Arc::new(ClaudeClient::new(&key, &config.base_url(Provider::Claude)))
        }
        Provider::OpenAI => {
            let key = config
                .api_key(Provider::OpenAI)
                .ok_or(ProviderError::NotConfigured(Provider::OpenAI))?;
            Arc::new(OpenAIClient::new(&key, &config.base_url(Provider::OpenAI)))
        }
    };
    Ok(client)
}

/// Check the status, then decode the body.
///
/// Decoding goes through `serde_json` directly so a bad body is reported as
/// `Malformed` rather than a transport error.
pub(crate) async fn read_json<T: DeserializeOwned>(
    provider: &'static str,
    response: Response,
) -> Result<T, ProviderError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ProviderError::Status { provider, status, body });
    }

    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| ProviderError::Malformed(e.to_string()))
}
