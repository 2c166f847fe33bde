//! HTTP/REST API layer for Chatline.
//!
//! Axum-based REST API at `/api/` with API key authentication, envelope
//! responses for JSON endpoints and SSE for generation output.

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod response;
pub mod router;
