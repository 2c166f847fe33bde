//! Generation provider implementations.
//!
//! Contains the OpenAI-compatible implementation of the
//! [`GenerationProvider`](chatline_core::llm::provider::GenerationProvider)
//! trait, a provider factory ([`create_provider`]) and the registry builder
//! ([`build_model_registry`]) that turns the configured model catalog into a
//! [`ModelRegistry`].

pub mod openai_compat;

use secrecy::SecretString;

use chatline_core::llm::box_provider::BoxGenerationProvider;
use chatline_core::llm::registry::ModelRegistry;
use chatline_types::config::{AppConfig, ModelConfig};
use chatline_types::llm::{GenerationError, ModelInfo};

use self::openai_compat::OpenAiCompatibleProvider;
use self::openai_compat::config::{OpenAiCompatConfig, default_base_url};

/// Create a [`BoxGenerationProvider`] from a [`ModelConfig`].
///
/// `base_url` wins when set; otherwise the provider name must be one with a
/// known default endpoint.
///
/// # Errors
///
/// Returns `AuthenticationFailed` when no API key is provided, and
/// `InvalidRequest` for an unknown provider without a `base_url`.
pub fn create_provider(
    config: &ModelConfig,
    api_key: Option<SecretString>,
) -> Result<BoxGenerationProvider, GenerationError> {
    let api_key = api_key.ok_or(GenerationError::AuthenticationFailed)?;

    let base_url = match config.base_url.as_deref() {
        Some(base_url) => base_url.to_string(),
        None => default_base_url(&config.provider)
            .ok_or_else(|| {
                GenerationError::InvalidRequest(format!(
                    "provider '{}' needs a base_url",
                    config.provider
                ))
            })?
            .to_string(),
    };

    let provider = OpenAiCompatibleProvider::new(OpenAiCompatConfig {
        provider_name: config.provider.clone(),
        base_url,
        api_key,
        model: config.model.clone(),
    });
    Ok(BoxGenerationProvider::new(provider))
}

/// Read a model's API key from the environment variable it names.
fn resolve_api_key(config: &ModelConfig) -> Option<SecretString> {
    let var = config.api_key_env.as_deref()?;
    match std::env::var(var) {
        Ok(key) if !key.trim().is_empty() => Some(SecretString::from(key)),
        _ => None,
    }
}

/// Build the model registry from the configured catalog.
///
/// Models whose provider cannot be constructed (missing key, unknown
/// endpoint) are skipped with a warning so that one bad entry does not take
/// the whole server down.
pub fn build_model_registry(config: &AppConfig) -> ModelRegistry {
    let mut registry = ModelRegistry::new(config.default_model.clone());

    for model in &config.models {
        match create_provider(model, resolve_api_key(model)) {
            Ok(provider) => {
                tracing::info!(
                    model_id = %model.id,
                    provider = %model.provider,
                    model = %model.model,
                    "Registered model"
                );
                registry.register(
                    ModelInfo {
                        id: model.id.clone(),
                        provider: model.provider.clone(),
                        model: model.model.clone(),
                    },
                    provider,
                );
            }
            Err(e) => {
                tracing::warn!(model_id = %model.id, error = %e, "Skipping model");
            }
        }
    }

    if registry.resolve(None).is_err() {
        tracing::warn!(
            default_model = %config.default_model,
            "Default model is not registered; requests must name a model"
        );
    }

    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(provider: &str, base_url: Option<&str>) -> ModelConfig {
        ModelConfig {
            id: "chat-model".to_string(),
            provider: provider.to_string(),
            model: "gpt-4o".to_string(),
            base_url: base_url.map(str::to_string),
            api_key_env: None,
        }
    }

    #[test]
    fn test_create_provider_known_name() {
        let provider = create_provider(&model("openai", None), Some(SecretString::from("sk-test"))).unwrap();
        assert_eq!(provider.name(), "openai");
    }

    #[test]
    fn test_create_provider_with_base_url() {
        let config = model("azure", Some("https://example.openai.azure.com/openai/v1"));
        let provider = create_provider(&config, Some(SecretString::from("key"))).unwrap();
        assert_eq!(provider.name(), "azure");
    }

    #[test]
    fn test_create_provider_unknown_without_base_url() {
        let result = create_provider(&model("azure", None), Some(SecretString::from("key")));
        assert!(matches!(result, Err(GenerationError::InvalidRequest(_))));
    }

    #[test]
    fn test_create_provider_missing_key() {
        let result = create_provider(&model("openai", None), None);
        assert!(matches!(result, Err(GenerationError::AuthenticationFailed)));
    }

    #[test]
    fn test_build_model_registry_skips_models_without_keys() {
        let mut with_key = model("openai", None);
        with_key.id = "chat-model".to_string();
        with_key.api_key_env = Some("CHATLINE_TEST_REGISTRY_KEY".to_string());
        let mut without_key = model("xai", None);
        without_key.id = "chat-model-reasoning".to_string();
        without_key.api_key_env = Some("CHATLINE_TEST_REGISTRY_MISSING".to_string());

        // SAFETY: test-only env var, not read concurrently by other tests
        unsafe { std::env::set_var("CHATLINE_TEST_REGISTRY_KEY", "sk-test") };

        let config = AppConfig {
            models: vec![with_key, without_key],
            ..AppConfig::default()
        };
        let registry = build_model_registry(&config);

        let ids: Vec<String> = registry.list().into_iter().map(|m| m.id).collect();
        assert_eq!(ids, vec!["chat-model"]);
        assert!(registry.resolve(None).is_ok());
    }
}
