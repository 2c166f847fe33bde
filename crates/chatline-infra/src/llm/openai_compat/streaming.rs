//! OpenAI SSE stream to [`GenerationEvent`] adapter.
//!
//! Maps `async-openai`'s [`ChatCompletionResponseStream`] chunks to the
//! provider-agnostic [`GenerationEvent`] enum defined in `chatline-types`.
//! Usage arrives on the final chunk (with an empty `choices` array) when the
//! request sets `stream_options.include_usage`; it is held back and emitted
//! once, after the last fragment.

use futures_util::StreamExt;

use async_openai::types::chat::ChatCompletionResponseStream;

use chatline_core::llm::provider::GenerationStream;
use chatline_types::llm::{GenerationError, GenerationEvent, Usage};

/// Map an async-openai [`ChatCompletionResponseStream`] to a [`GenerationStream`].
///
/// The returned stream emits:
/// 1. `Fragment` -- for each non-empty text content delta, in order
/// 2. `Usage` -- at most once, after the provider's stream ends
pub fn map_openai_stream(stream: ChatCompletionResponseStream) -> GenerationStream {
    Box::pin(async_stream::try_stream! {
        let mut stream = stream;
        let mut usage: Option<Usage> = None;

        while let Some(result) = stream.next().await {
            let chunk = result.map_err(|e| GenerationError::Stream(e.to_string()))?;

            if let Some(u) = chunk.usage.as_ref() {
                usage = Some(Usage {
                    input_tokens: u.prompt_tokens,
                    output_tokens: u.completion_tokens,
                    total_tokens: u.total_tokens,
                });
            }

            for choice in &chunk.choices {
                if let Some(text) = choice.delta.content.as_ref() {
                    if !text.is_empty() {
                        yield GenerationEvent::Fragment { text: text.clone() };
                    }
                }
            }
        }

        if let Some(usage) = usage {
            yield GenerationEvent::Usage(usage);
        }
    })
}
