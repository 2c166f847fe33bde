//! HTTP request handlers.

pub mod chat;
pub mod document;
pub mod history;
pub mod models;
pub mod vote;
