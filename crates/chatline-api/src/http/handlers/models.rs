//! GET /api/models - the configured model catalog.

use std::time::Instant;

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use chatline_types::llm::ModelInfo;

use crate::http::error::AppError;
use crate::http::extractors::auth::AuthUser;
use crate::http::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelCatalog {
    pub default_model: String,
    pub models: Vec<ModelInfo>,
}

pub async fn list_models(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> Result<Json<ApiResponse<ModelCatalog>>, AppError> {
    let start = Instant::now();
    let catalog = ModelCatalog {
        default_model: state.chat_service.default_model().to_string(),
        models: state.chat_service.models(),
    };
    Ok(ApiResponse::timed(catalog, start))
}
