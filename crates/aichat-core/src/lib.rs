pub mod ai;
pub mod config;
pub mod controller;
pub mod dispatcher;
pub mod error;
pub mod provider;
pub mod state;

// Re-export main types for convenience
pub use ai::{build_provider, ClaudeClient, OllamaClient, OpenAIClient};
pub use config::Config;
pub use controller::{Controller, Reply, RequestId, SubmitStatus};
pub use dispatcher::{Dispatcher, Outcome, FALLBACK_REPLY};
pub use error::{ConfigError, ProviderError};
pub use provider::{CompletionProvider, Provider};
pub use state::{ChatMessage, ChatRole, Transcript};
