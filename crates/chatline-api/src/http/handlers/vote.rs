//! Vote endpoints.
//!
//! - GET  /api/vote?chatId=...  - votes on a chat (owner only)
//! - POST /api/vote             - upsert a vote on one message

use std::time::Instant;

use axum::Json;
use axum::extract::{Query, State};
use serde::Deserialize;
use uuid::Uuid;

use chatline_types::chat::Vote;

use crate::http::error::AppError;
use crate::http::extractors::auth::AuthUser;
use crate::http::extractors::query::VoteQuery;
use crate::http::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteBody {
    pub chat_id: Uuid,
    pub message_id: Uuid,
    pub is_upvoted: bool,
}

pub async fn list_votes(
    State(state): State<AppState>,
    AuthUser(auth): AuthUser,
    Query(query): Query<VoteQuery>,
) -> Result<Json<ApiResponse<Vec<Vote>>>, AppError> {
    let start = Instant::now();
    let votes = state.chat_service.list_votes(&auth, &query.chat_id).await?;
    Ok(ApiResponse::timed(votes, start))
}

pub async fn cast_vote(
    State(state): State<AppState>,
    AuthUser(auth): AuthUser,
    Json(body): Json<VoteBody>,
) -> Result<Json<ApiResponse<Vote>>, AppError> {
    let start = Instant::now();
    let vote = state
        .chat_service
        .vote(&auth, &body.chat_id, &body.message_id, body.is_upvoted)
        .await?;
    Ok(ApiResponse::timed(vote, start))
}
