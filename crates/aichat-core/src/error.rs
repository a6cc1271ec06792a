use std::time::Duration;

use thiserror::Error;

use crate::provider::Provider;

/// Any failure talking to a text-generation provider
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Transport-level failure (connect, TLS, body read)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider answered with a non-success status
    #[error("{provider} API error {status}: {body}")]
    Status {
        provider: &'static str,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Malformed response: {0}")]
    Malformed(String),

    /// Provider answered but produced no text
    #[error("Provider returned an empty completion")]
    EmptyCompletion,

    #[error("{} is not configured: missing API key", .0.display_name())]
    NotConfigured(Provider),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Provider task panicked")]
    Panicked,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    Parse(#[from] serde_json::Error),
}
