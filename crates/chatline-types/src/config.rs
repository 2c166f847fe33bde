//! Global configuration types for Chatline.
//!
//! `AppConfig` represents the top-level `config.toml` that controls the
//! context window, generation locking, and the model catalog.

use serde::{Deserialize, Serialize};

/// Top-level configuration.
///
/// Loaded from `~/.chatline/config.toml`. All fields have sensible defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Model id used when a request does not name one.
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Maximum number of history messages forwarded to the generation engine.
    #[serde(default = "default_context_limit")]
    pub context_limit: u32,

    /// Maximum length (in characters) of a title derived from the first message.
    #[serde(default = "default_title_max_chars")]
    pub title_max_chars: usize,

    /// Optional system prompt prepended to every generation.
    #[serde(default)]
    pub system_prompt: Option<String>,

    #[serde(default)]
    pub generation: GenerationConfig,

    /// Model catalog.
    #[serde(default)]
    pub models: Vec<ModelConfig>,
}

fn default_model() -> String {
    "chat-model".to_string()
}

fn default_context_limit() -> u32 {
    50
}

fn default_title_max_chars() -> usize {
    100
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_model: default_model(),
            context_limit: default_context_limit(),
            title_max_chars: default_title_max_chars(),
            system_prompt: None,
            generation: GenerationConfig::default(),
            models: Vec::new(),
        }
    }
}

/// Tuning for the generation pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// How long a request waits for another generation on the same chat to finish.
    #[serde(default = "default_lock_timeout_secs")]
    pub lock_timeout_secs: u64,

    /// Capacity of the bounded channel between the orchestrator and the client.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_lock_timeout_secs() -> u64 {
    120
}

fn default_channel_capacity() -> usize {
    64
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            lock_timeout_secs: default_lock_timeout_secs(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

/// One entry of the model catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Public identifier (e.g., "chat-model").
    pub id: String,
    /// Provider backend name (e.g., "openai", "azure", "gateway").
    pub provider: String,
    /// Provider-side model name (e.g., "gpt-4o").
    pub model: String,
    /// Override the default base URL for the provider.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Environment variable holding the API key.
    #[serde(default)]
    pub api_key_env: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_config_default_values() {
        let config = AppConfig::default();
        assert_eq!(config.default_model, "chat-model");
        assert_eq!(config.context_limit, 50);
        assert_eq!(config.title_max_chars, 100);
        assert_eq!(config.generation.lock_timeout_secs, 120);
        assert!(config.models.is_empty());
    }

    #[test]
    fn test_app_config_deserialize_empty() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.context_limit, 50);
        assert_eq!(config.generation.channel_capacity, 64);
    }

    #[test]
    fn test_app_config_deserialize_with_models() {
        let toml_str = r#"
default_model = "azure-gpt-4o"
context_limit = 20

[generation]
lock_timeout_secs = 30

[[models]]
id = "azure-gpt-4o"
provider = "azure"
model = "gpt-4o"
base_url = "https://example.openai.azure.com/openai/deployments/gpt-4o"
api_key_env = "AZURE_API_KEY"

[[models]]
id = "chat-model"
provider = "openai"
model = "gpt-4o-mini"
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.default_model, "azure-gpt-4o");
        assert_eq!(config.context_limit, 20);
        assert_eq!(config.generation.lock_timeout_secs, 30);
        assert_eq!(config.generation.channel_capacity, 64);
        assert_eq!(config.models.len(), 2);
        assert_eq!(config.models[0].api_key_env.as_deref(), Some("AZURE_API_KEY"));
        assert!(config.models[1].base_url.is_none());
    }
}
