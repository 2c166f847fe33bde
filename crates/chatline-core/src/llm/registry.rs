//! Model registry for runtime model lookup.
//!
//! Maps the public model ids clients send (`selectedChatModel`) to a boxed
//! provider plus the provider-side model name.

use std::collections::HashMap;
use std::sync::Arc;

use chatline_types::error::ChatError;
use chatline_types::llm::{GenerationError, ModelInfo};
use futures_util::future::join_all;

use super::box_provider::BoxGenerationProvider;

/// A model id resolved to a callable provider.
#[derive(Clone)]
pub struct ResolvedModel {
    pub info: ModelInfo,
    pub provider: Arc<BoxGenerationProvider>,
}

/// Outcome of pinging one registered model.
#[derive(Debug)]
pub struct ModelCheck {
    pub info: ModelInfo,
    pub result: Result<(), GenerationError>,
}

/// Registry of configured models, indexed by public id.
pub struct ModelRegistry {
    default_model: String,
    models: HashMap<String, ResolvedModel>,
}

impl ModelRegistry {
    /// Create an empty registry whose fallback is `default_model`.
    pub fn new(default_model: impl Into<String>) -> Self {
        Self {
            default_model: default_model.into(),
            models: HashMap::new(),
        }
    }

    /// Register a model. If the id already exists, it is replaced.
    pub fn register(&mut self, info: ModelInfo, provider: BoxGenerationProvider) {
        self.models.insert(
            info.id.clone(),
            ResolvedModel {
                info,
                provider: Arc::new(provider),
            },
        );
    }

    /// Resolve a requested model id.
    ///
    /// `None` (or an empty id) selects the default model. An id that is not
    /// registered is a `BadRequest`.
    pub fn resolve(&self, model_id: Option<&str>) -> Result<ResolvedModel, ChatError> {
        let id = match model_id.map(str::trim) {
            Some(id) if !id.is_empty() => id,
            _ => self.default_model.as_str(),
        };
        self.models
            .get(id)
            .cloned()
            .ok_or_else(|| ChatError::BadRequest(format!("unknown model '{id}'")))
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    /// All registered models, sorted by id.
    pub fn list(&self) -> Vec<ModelInfo> {
        let mut models: Vec<ModelInfo> = self.models.values().map(|m| m.info.clone()).collect();
        models.sort_by(|a, b| a.id.cmp(&b.id));
        models
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Ping every registered model concurrently. Results are sorted by id.
    pub async fn check_all(&self) -> Vec<ModelCheck> {
        let mut models: Vec<&ResolvedModel> = self.models.values().collect();
        models.sort_by(|a, b| a.info.id.cmp(&b.info.id));

        join_all(models.into_iter().map(|model| async move {
            let result = model.provider.ping().await;
            if let Err(e) = &result {
                tracing::warn!(model = %model.info.id, error = %e, "Model check failed");
            }
            ModelCheck {
                info: model.info.clone(),
                result,
            }
        }))
        .await
    }
}
