//! Business logic and repository trait definitions for Chatline.
//!
//! This crate defines the "ports" (repository and provider traits) that the
//! infrastructure layer implements, plus the conversation streaming pipeline
//! built on top of them. It depends only on `chatline-types` -- never on
//! `chatline-infra` or any database/IO crate.

pub mod chat;
pub mod llm;
pub mod ownership;
pub mod repository;

#[cfg(test)]
pub(crate) mod testing;
