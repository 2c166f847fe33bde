//! Infrastructure layer for Chatline.
//!
//! Contains implementations of the repository and provider traits defined in
//! `chatline-core`: SQLite storage, the OpenAI-compatible generation provider,
//! configuration loading, and API key hashing.

pub mod config;
pub mod crypto;
pub mod llm;
pub mod sqlite;
