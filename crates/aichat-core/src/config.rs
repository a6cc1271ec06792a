use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::ai::claude::CLAUDE_API_URL;
use crate::ai::ollama::DEFAULT_OLLAMA_URL;
use crate::ai::openai::OPENAI_API_URL;
use crate::error::ConfigError;
use crate::provider::Provider;

pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub provider: Option<String>,
    pub default_model: Option<String>,
    pub ollama_url: Option<String>,
    pub claude_url: Option<String>,
    pub openai_url: Option<String>,
    pub claude_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    /// 0 disables the timeout
    pub request_timeout_secs: Option<u64>,
}

impl Config {
    pub fn new() -> Self {
        Self {
            provider: Some(Provider::Ollama.as_str().to_string()),
            ..Self::default()
        }
    }

    /// Load from the user config directory, falling back to defaults when
    /// no file exists yet.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("aichat").join("config.json"))
    }

    /// Unknown provider names fall back to Ollama.
    pub fn selected_provider(&self) -> Provider {
        self.provider
            .as_deref()
            .and_then(Provider::from_str)
            .unwrap_or(Provider::Ollama)
    }

    pub fn model(&self) -> String {
        self.default_model
            .clone()
            .unwrap_or_else(|| self.selected_provider().default_model().to_string())
    }

    /// API root for `provider`, from the file or the public default
    pub fn base_url(&self, provider: Provider) -> String {
        let (stored, default) = match provider {
            Provider::Ollama => (&self.ollama_url, DEFAULT_OLLAMA_URL),
            Provider::Claude => (&self.claude_url, CLAUDE_API_URL),
            Provider::OpenAI => (&self.openai_url, OPENAI_API_URL),
        };
        stored.clone().unwrap_or_else(|| default.to_string())
    }

    /// Environment variables win over keys stored in the file.
    pub fn api_key(&self, provider: Provider) -> Option<String> {
        let (env_var, stored) = match provider {
            Provider::Ollama => return None,
            Provider::Claude => ("ANTHROPIC_API_KEY", &self.claude_api_key),
            Provider::OpenAI => ("OPENAI_API_KEY", &self.openai_api_key),
        };
        std::env::var(env_var)
            .ok()
            .filter(|k| !k.is_empty())
            .or_else(|| stored.clone())
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        match self.request_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS) {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();

        assert_eq!(config.selected_provider(), Provider::Ollama);
        assert_eq!(config.model(), "llama3.2:latest");
        assert_eq!(config.base_url(Provider::Ollama), DEFAULT_OLLAMA_URL);
        assert_eq!(config.base_url(Provider::Claude), CLAUDE_API_URL);
        assert_eq!(config.base_url(Provider::OpenAI), OPENAI_API_URL);
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(DEFAULT_TIMEOUT_SECS)));
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let config = Config {
            provider: Some("openai".to_string()),
            default_model: Some("gpt-4o-mini".to_string()),
            request_timeout_secs: Some(0),
            ..Config::new()
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.selected_provider(), Provider::OpenAI);
        assert_eq!(loaded.model(), "gpt-4o-mini");
        assert_eq!(loaded.request_timeout(), None);
    }

    #[test]
    fn test_partial_file_uses_field_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "provider": "claude" }"#).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.selected_provider(), Provider::Claude);
        assert_eq!(loaded.model(), "claude-sonnet-4-20250514");
    }

    #[test]
    fn test_invalid_file_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(Config::load_from(&path), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_hosted_base_urls_come_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{ "claude_url": "http://proxy.local/anthropic", "openai_url": "http://proxy.local/openai" }"#,
        )
        .unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.base_url(Provider::Claude), "http://proxy.local/anthropic");
        assert_eq!(loaded.base_url(Provider::OpenAI), "http://proxy.local/openai");
        assert_eq!(loaded.base_url(Provider::Ollama), DEFAULT_OLLAMA_URL);
    }

    #[test]
    fn test_unknown_provider_falls_back_to_ollama() {
        let config = Config {
            provider: Some("gemini".to_string()),
            ..Config::new()
        };
        assert_eq!(config.selected_provider(), Provider::Ollama);
    }
}
