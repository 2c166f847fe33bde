//! GenerationProvider trait definition.
//!
//! This is the core abstraction that all text-generation backends implement.
//! Uses RPITIT for `ping`, and `Pin<Box<dyn Stream>>` for `stream` (streams
//! need to be object-safe for the BoxGenerationProvider wrapper).

use std::pin::Pin;

use futures_util::Stream;

use chatline_types::llm::{GenerationError, GenerationEvent, GenerationRequest};

/// A lazy, finite, non-restartable sequence of generation events.
pub type GenerationStream =
    Pin<Box<dyn Stream<Item = Result<GenerationEvent, GenerationError>> + Send + 'static>>;

/// Trait for generation backends (OpenAI, Azure OpenAI, gateways, ...).
///
/// Implementations live in chatline-infra (e.g., `OpenAiCompatibleProvider`).
pub trait GenerationProvider: Send + Sync {
    /// Human-readable provider name (e.g., "openai").
    fn name(&self) -> &str;

    /// Start a streaming generation.
    ///
    /// The stream yields zero or more `Fragment` events, then at most one
    /// `Usage` event. Failures, including failure to connect, arrive as an
    /// `Err` item.
    fn stream(&self, request: GenerationRequest) -> GenerationStream;

    /// Send a minimal request to verify credentials and connectivity.
    fn ping(&self) -> impl std::future::Future<Output = Result<(), GenerationError>> + Send;
}
