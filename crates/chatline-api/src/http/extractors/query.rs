//! Query parameter extractors for list endpoints.

use serde::Deserialize;
use uuid::Uuid;

/// Pagination for list endpoints.
#[derive(Debug, Deserialize, Default)]
pub struct PageQuery {
    /// Maximum results.
    pub limit: Option<i64>,
    /// Offset for pagination.
    pub offset: Option<i64>,
}

/// `GET /api/vote?chatId=...`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteQuery {
    pub chat_id: Uuid,
}
