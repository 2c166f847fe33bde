//! Configuration and per-provider base URLs for OpenAI-compatible backends.

use secrecy::SecretString;

/// Configuration for an OpenAI-compatible generation backend.
///
/// Used to construct an [`super::OpenAiCompatibleProvider`].
pub struct OpenAiCompatConfig {
    /// Human-readable provider name (e.g., "openai", "xai").
    pub provider_name: String,
    /// Base URL for the API (e.g., "https://api.openai.com/v1").
    pub base_url: String,
    pub api_key: SecretString,
    /// Provider-side model name (e.g., "gpt-4o", "grok-2-vision").
    pub model: String,
}

/// Default base URL for a well-known provider name.
///
/// Returns `None` for names that must be configured with an explicit
/// `base_url` (self-hosted gateways, Azure deployments, ...).
pub fn default_base_url(provider_name: &str) -> Option<&'static str> {
    match provider_name {
        "openai" => Some("https://api.openai.com/v1"),
        "xai" => Some("https://api.x.ai/v1"),
        "gemini" => Some("https://generativelanguage.googleapis.com/v1beta/openai"),
        "mistral" => Some("https://api.mistral.ai/v1"),
        _ => None,
    }
}

/// OpenAI default configuration.
pub fn openai_defaults(api_key: SecretString, model: &str) -> OpenAiCompatConfig {
    OpenAiCompatConfig {
        provider_name: "openai".into(),
        base_url: "https://api.openai.com/v1".into(),
        api_key,
        model: model.into(),
    }
}

/// xAI (Grok) default configuration.
pub fn xai_defaults(api_key: SecretString, model: &str) -> OpenAiCompatConfig {
    OpenAiCompatConfig {
        provider_name: "xai".into(),
        base_url: "https://api.x.ai/v1".into(),
        api_key,
        model: model.into(),
    }
}
