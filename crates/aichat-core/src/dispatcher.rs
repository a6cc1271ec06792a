//! One outbound request per user message.
//!
//! The dispatcher never returns an error: every provider failure becomes an
//! [`Outcome::Failure`], which renders as [`FALLBACK_REPLY`]. The failure
//! reason is kept so it can be logged.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::FutureExt;
use tracing::{debug, info, warn};

use crate::error::ProviderError;
use crate::provider::CompletionProvider;
use crate::state::ChatMessage;

/// Shown to the user in place of an answer whenever a request fails
pub const FALLBACK_REPLY: &str = "Sorry, an error occurred while processing your request.";

/// Terminal result of one dispatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success(String),
    Failure(String),
}

impl Outcome {
    /// Text to display. Failures all render the same fallback sentence.
    pub fn text(&self) -> &str {
        match self {
            Outcome::Success(text) => text,
            Outcome::Failure(_) => FALLBACK_REPLY,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }
}

#[derive(Clone)]
pub struct Dispatcher {
    provider: Arc<dyn CompletionProvider>,
    model: String,
    timeout: Option<Duration>,
}

impl Dispatcher {
    pub fn new(provider: Arc<dyn CompletionProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Send `message` as the only context and wait for the completion.
    pub async fn dispatch(&self, message: &str) -> Outcome {
        let started = Instant::now();
        debug!(
            provider = self.provider.name(),
            model = %self.model,
            chars = message.chars().count(),
            "dispatching request"
        );

        match self.request(message).await {
            Ok(text) => {
                info!(
                    provider = self.provider.name(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    chars = text.chars().count(),
                    "completion received"
                );
                Outcome::Success(text)
            }
            Err(e) => {
                warn!(
                    provider = self.provider.name(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    error = %e,
                    "completion failed"
                );
                Outcome::Failure(e.to_string())
            }
        }
    }

    async fn request(&self, message: &str) -> Result<String, ProviderError> {
        let messages = [ChatMessage::user(message)];
        let call = AssertUnwindSafe(self.provider.complete(&self.model, &messages)).catch_unwind();

        let result = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| ProviderError::Timeout(limit))?,
            None => call.await,
        };

        result.map_err(|_| ProviderError::Panicked)?
    }
}
