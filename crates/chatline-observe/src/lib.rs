//! Observability setup for Chatline: tracing subscriber and optional
//! OpenTelemetry span export.

pub mod tracing_setup;
