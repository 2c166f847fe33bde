//! GET /api/history - the caller's chats, newest first.

use std::time::Instant;

use axum::Json;
use axum::extract::{Query, State};

use chatline_types::chat::Chat;

use crate::http::error::AppError;
use crate::http::extractors::auth::AuthUser;
use crate::http::extractors::query::PageQuery;
use crate::http::response::ApiResponse;
use crate::state::AppState;

const DEFAULT_HISTORY_LIMIT: i64 = 50;

pub async fn list_history(
    State(state): State<AppState>,
    AuthUser(auth): AuthUser,
    Query(page): Query<PageQuery>,
) -> Result<Json<ApiResponse<Vec<Chat>>>, AppError> {
    let start = Instant::now();
    let limit = page.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    if limit < 0 || page.offset.is_some_and(|o| o < 0) {
        return Err(AppError::Validation(
            "limit and offset must be non-negative".to_string(),
        ));
    }

    let chats = state
        .chat_service
        .list_history(&auth, Some(limit), page.offset)
        .await?;
    Ok(ApiResponse::timed(chats, start))
}
