//! GET /api/document/{id} - ownership-checked document lookup.

use std::time::Instant;

use axum::Json;
use axum::extract::{Path, State};
use uuid::Uuid;

use chatline_types::document::Document;

use crate::http::error::AppError;
use crate::http::extractors::auth::AuthUser;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Latest version of a document the caller owns.
pub async fn get_document(
    State(state): State<AppState>,
    AuthUser(auth): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Document>>, AppError> {
    let start = Instant::now();
    let document = state.chat_service.get_document(&auth, &id).await?;
    Ok(ApiResponse::timed(document, start))
}
