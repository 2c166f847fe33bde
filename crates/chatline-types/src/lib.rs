//! Shared domain types for Chatline.
//!
//! This crate contains the domain types used across the Chatline workspace:
//! users, chats, messages, stream handles, votes, generation requests, and
//! their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod chat;
pub mod config;
pub mod document;
pub mod error;
pub mod llm;
pub mod message;
pub mod stream;
pub mod user;
