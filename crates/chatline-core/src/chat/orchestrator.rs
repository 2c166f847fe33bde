//! Generation orchestrator.
//!
//! Drives one generation attempt for a chat:
//!
//! 1. `assemble`: append the user turn, open a stream handle, read the
//!    recent context.
//! 2. `stream_and_commit`: call the provider, relay every fragment to the
//!    live channel in arrival order while buffering it, then persist the
//!    buffer as exactly one assistant message and record usage.
//!
//! A provider error ends the stream with one error frame and persists no
//! assistant message. A client that goes away does not stop the generation:
//! the orchestrator keeps draining the provider and still commits.

use std::sync::Arc;

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use chatline_types::chat::{Chat, ChatUsage};
use chatline_types::error::ChatError;
use chatline_types::llm::{ContextMessage, GenerationEvent, GenerationRequest, Usage};
use chatline_types::message::{Attachment, Message, MessageRole};
use chatline_types::stream::{StreamFrame, StreamHandle};

use crate::llm::box_provider::BoxGenerationProvider;
use crate::repository::chat::ChatRepository;
use crate::repository::message::MessageRepository;
use crate::repository::stream::StreamRepository;

/// Everything a generation needs once the user turn is recorded.
#[derive(Debug, Clone)]
pub struct AssembledGeneration {
    pub chat: Chat,
    pub user_message: Message,
    pub handle: StreamHandle,
    /// Newest messages of the chat, oldest first, including `user_message`.
    pub context: Vec<Message>,
}

/// Final state of one generation attempt.
#[derive(Debug, Clone)]
pub enum GenerationOutcome {
    /// The assistant reply was persisted.
    Committed {
        message: Message,
        usage: Option<Usage>,
    },
    /// The provider failed; nothing was persisted for this attempt.
    Failed {
        error: String,
        discarded_chars: usize,
    },
    /// The reply streamed to the client but could not be persisted.
    CommitFailed { error: String },
}

impl GenerationOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, GenerationOutcome::Committed { .. })
    }
}

/// Relays frames to the client until the receiving side goes away.
struct FrameRelay {
    tx: Option<mpsc::Sender<StreamFrame>>,
    handle: StreamHandle,
}

impl FrameRelay {
    async fn send(&mut self, frame: StreamFrame) {
        let Some(tx) = &self.tx else {
            return;
        };
        if tx.send(frame).await.is_err() {
            debug!(
                chat_id = %self.handle.chat_id,
                stream_id = %self.handle.id,
                "Client disconnected, continuing generation"
            );
            self.tx = None;
        }
    }
}

/// Orchestrates context assembly, streaming, and the final commit.
pub struct GenerationOrchestrator<C, M, S> {
    chats: Arc<C>,
    messages: Arc<M>,
    streams: Arc<S>,
    context_limit: u32,
    system_prompt: Option<String>,
}

impl<C, M, S> Clone for GenerationOrchestrator<C, M, S> {
    fn clone(&self) -> Self {
        Self {
            chats: Arc::clone(&self.chats),
            messages: Arc::clone(&self.messages),
            streams: Arc::clone(&self.streams),
            context_limit: self.context_limit,
            system_prompt: self.system_prompt.clone(),
        }
    }
}

impl<C, M, S> GenerationOrchestrator<C, M, S>
where
    C: ChatRepository,
    M: MessageRepository,
    S: StreamRepository,
{
    pub fn new(
        chats: Arc<C>,
        messages: Arc<M>,
        streams: Arc<S>,
        context_limit: u32,
        system_prompt: Option<String>,
    ) -> Self {
        Self {
            chats,
            messages,
            streams,
            context_limit,
            system_prompt,
        }
    }

    /// Record the user turn and gather the context for the provider.
    ///
    /// The caller must already hold the chat's generation lock and have
    /// verified ownership.
    pub async fn assemble(
        &self,
        chat: Chat,
        content: String,
        attachments: Vec<Attachment>,
    ) -> Result<AssembledGeneration, ChatError> {
        let user_message = self
            .messages
            .append(chat.id, MessageRole::User, content, attachments)
            .await?;
        let handle = self.streams.open(&chat.id).await?;
        let context = self
            .messages
            .recent_context(&chat.id, self.context_limit)
            .await?;

        debug!(
            chat_id = %chat.id,
            stream_id = %handle.id,
            context_len = context.len(),
            "Context assembled"
        );

        Ok(AssembledGeneration {
            chat,
            user_message,
            handle,
            context,
        })
    }

    /// Build the provider request for a context.
    pub fn build_request(&self, model: &str, context: &[Message]) -> GenerationRequest {
        GenerationRequest {
            model: model.to_string(),
            messages: context.iter().map(ContextMessage::from).collect(),
            system: self.system_prompt.clone(),
        }
    }

    /// Stream the provider's reply to `tx` and persist it.
    pub async fn stream_and_commit(
        &self,
        assembled: AssembledGeneration,
        provider: &BoxGenerationProvider,
        model: &str,
        tx: mpsc::Sender<StreamFrame>,
    ) -> GenerationOutcome {
        let chat_id = assembled.chat.id;
        let request = self.build_request(model, &assembled.context);
        let mut relay = FrameRelay {
            tx: Some(tx),
            handle: assembled.handle.clone(),
        };

        let mut buffer = String::new();
        let mut usage: Option<Usage> = None;
        let mut events = provider.stream(request);

        while let Some(event) = events.next().await {
            match event {
                Ok(GenerationEvent::Fragment { text }) => {
                    if text.is_empty() {
                        continue;
                    }
                    buffer.push_str(&text);
                    relay.send(StreamFrame::content(text)).await;
                }
                Ok(GenerationEvent::Usage(reported)) => {
                    usage = Some(reported);
                }
                Err(e) => {
                    warn!(
                        chat_id = %chat_id,
                        stream_id = %assembled.handle.id,
                        provider = provider.name(),
                        discarded_chars = buffer.chars().count(),
                        error = %e,
                        "Generation failed mid-stream"
                    );
                    relay.send(StreamFrame::error(e.to_string())).await;
                    return GenerationOutcome::Failed {
                        error: e.to_string(),
                        discarded_chars: buffer.chars().count(),
                    };
                }
            }
        }

        let message = match self
            .messages
            .append(chat_id, MessageRole::Assistant, buffer, Vec::new())
            .await
        {
            Ok(message) => message,
            Err(e) => {
                error!(
                    chat_id = %chat_id,
                    stream_id = %assembled.handle.id,
                    divergence = true,
                    error = %e,
                    "Reply was streamed but could not be recorded"
                );
                relay
                    .send(StreamFrame::error("failed to save the response"))
                    .await;
                return GenerationOutcome::CommitFailed {
                    error: e.to_string(),
                };
            }
        };

        if let Some(usage) = usage {
            let chat_usage = ChatUsage {
                total_tokens: usage.total_tokens,
            };
            if let Err(e) = self.chats.update_last_usage(&chat_id, chat_usage).await {
                warn!(chat_id = %chat_id, error = %e, "Failed to record token usage");
            }
        }

        info!(
            chat_id = %chat_id,
            stream_id = %assembled.handle.id,
            message_id = %message.id,
            total_tokens = usage.map(|u| u.total_tokens),
            "Generation committed"
        );

        GenerationOutcome::Committed { message, usage }
    }
}
