//! Repository trait definitions (ports).
//!
//! These traits define the storage interface that the infrastructure layer
//! (chatline-infra) implements. The core crate never depends on any
//! specific storage technology.

pub mod chat;
pub mod document;
pub mod message;
pub mod stream;
