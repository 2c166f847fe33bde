//! Axum router configuration with middleware.
//!
//! All routes are under `/api/`, plus an unauthenticated `/health`.
//! Middleware: CORS, tracing.

use axum::Router;
use axum::routing::{get, patch, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([axum::http::HeaderName::from_static(
            handlers::chat::CHAT_ID_HEADER,
        )]);

    let api_routes = Router::new()
        // Generation
        .route("/chat", post(handlers::chat::post_chat))
        .route("/chat/{id}/stream", get(handlers::chat::resume_stream))
        // Chat records
        .route(
            "/chat/{id}",
            get(handlers::chat::get_chat).delete(handlers::chat::delete_chat),
        )
        .route(
            "/chat/{id}/visibility",
            patch(handlers::chat::update_visibility),
        )
        .route("/chat/{id}/messages", get(handlers::chat::list_messages))
        .route("/history", get(handlers::history::list_history))
        // Votes
        .route(
            "/vote",
            get(handlers::vote::list_votes).post(handlers::vote::cast_vote),
        )
        .route("/document/{id}", get(handlers::document::get_document))
        .route("/models", get(handlers::models::list_models));

    Router::new()
        .nest("/api", api_routes)
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health - Simple health check endpoint (no auth required).
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
