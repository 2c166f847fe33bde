//! The conversation streaming pipeline.
//!
//! - `lock`: per-chat generation locks
//! - `orchestrator`: context assembly, streaming, and the final commit
//! - `service`: the façade the transport layer calls

pub mod lock;
pub mod orchestrator;
pub mod service;
