//! In-memory fakes shared by the unit tests of this crate.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chatline_types::chat::{Chat, ChatUsage, Visibility, Vote};
use chatline_types::document::Document;
use chatline_types::error::RepositoryError;
use chatline_types::llm::{GenerationError, GenerationEvent, GenerationRequest, Usage};
use chatline_types::message::{Attachment, Message, MessageRole};
use chatline_types::stream::StreamHandle;
use chatline_types::user::{AuthContext, UserKind};
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Notify;
use uuid::Uuid;

use crate::llm::provider::{GenerationProvider, GenerationStream};
use crate::repository::chat::ChatRepository;
use crate::repository::document::DocumentRepository;
use crate::repository::message::MessageRepository;
use crate::repository::stream::StreamRepository;

pub fn alice() -> AuthContext {
    AuthContext::new(Uuid::from_u128(0xA11CE), UserKind::Regular)
}

pub fn bob() -> AuthContext {
    AuthContext::new(Uuid::from_u128(0xB0B), UserKind::Regular)
}

pub fn make_chat(owner_id: Uuid, visibility: Visibility) -> Chat {
    Chat {
        id: Uuid::now_v7(),
        owner_id,
        title: "test chat".to_string(),
        visibility,
        last_usage: None,
        created_at: Utc::now(),
    }
}

#[derive(Default)]
struct State {
    chats: HashMap<Uuid, Chat>,
    messages: Vec<Message>,
    streams: Vec<StreamHandle>,
    votes: Vec<Vote>,
    documents: HashMap<Uuid, Document>,
}

/// Implements every repository trait over one shared in-memory state.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    fail_assistant_appends: AtomicBool,
}

impl MemoryStore {
    pub fn insert_document(&self, owner_id: Uuid, title: &str) -> Document {
        let doc = Document {
            id: Uuid::now_v7(),
            owner_id,
            title: title.to_string(),
            created_at: Utc::now(),
        };
        self.state
            .lock()
            .unwrap()
            .documents
            .insert(doc.id, doc.clone());
        doc
    }

    /// Make every subsequent assistant append fail with a query error.
    pub fn fail_assistant_appends(&self) {
        self.fail_assistant_appends.store(true, Ordering::SeqCst);
    }

    pub fn messages_of(&self, chat_id: &Uuid) -> Vec<Message> {
        let state = self.state.lock().unwrap();
        let mut messages: Vec<Message> = state
            .messages
            .iter()
            .filter(|m| m.chat_id == *chat_id)
            .cloned()
            .collect();
        messages.sort_by_key(|m| m.created_at);
        messages
    }

    pub fn stream_count(&self, chat_id: &Uuid) -> usize {
        let state = self.state.lock().unwrap();
        state.streams.iter().filter(|s| s.chat_id == *chat_id).count()
    }

    pub fn vote_count(&self, chat_id: &Uuid) -> usize {
        let state = self.state.lock().unwrap();
        state.votes.iter().filter(|v| v.chat_id == *chat_id).count()
    }

    pub fn chat(&self, chat_id: &Uuid) -> Option<Chat> {
        self.state.lock().unwrap().chats.get(chat_id).cloned()
    }
}

fn missing_chat() -> RepositoryError {
    RepositoryError::Query("FOREIGN KEY constraint failed".to_string())
}

fn page<T>(items: Vec<T>, limit: Option<i64>, offset: Option<i64>) -> Vec<T> {
    let offset = offset.unwrap_or(0).max(0) as usize;
    let limit = limit.map_or(usize::MAX, |l| l.max(0) as usize);
    items.into_iter().skip(offset).take(limit).collect()
}

impl ChatRepository for MemoryStore {
    async fn create_chat(&self, chat: &Chat) -> Result<Chat, RepositoryError> {
        let mut state = self.state.lock().unwrap();
        if state.chats.contains_key(&chat.id) {
            return Err(RepositoryError::Conflict(format!("chat {} exists", chat.id)));
        }
        state.chats.insert(chat.id, chat.clone());
        Ok(chat.clone())
    }

    async fn get_chat(&self, chat_id: &Uuid) -> Result<Option<Chat>, RepositoryError> {
        Ok(self.state.lock().unwrap().chats.get(chat_id).cloned())
    }

    async fn list_chats(
        &self,
        owner_id: &Uuid,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<Chat>, RepositoryError> {
        let state = self.state.lock().unwrap();
        let mut chats: Vec<Chat> = state
            .chats
            .values()
            .filter(|c| c.owner_id == *owner_id)
            .cloned()
            .collect();
        chats.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(page(chats, limit, offset))
    }

    async fn update_visibility(
        &self,
        chat_id: &Uuid,
        visibility: Visibility,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().unwrap();
        let chat = state.chats.get_mut(chat_id).ok_or(RepositoryError::NotFound)?;
        chat.visibility = visibility;
        Ok(())
    }

    async fn update_last_usage(
        &self,
        chat_id: &Uuid,
        usage: ChatUsage,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().unwrap();
        let chat = state.chats.get_mut(chat_id).ok_or(RepositoryError::NotFound)?;
        chat.last_usage = Some(usage);
        Ok(())
    }

    async fn delete_chat(&self, chat_id: &Uuid) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().unwrap();
        if !state.chats.contains_key(chat_id) {
            return Err(RepositoryError::NotFound);
        }
        state.votes.retain(|v| v.chat_id != *chat_id);
        state.streams.retain(|s| s.chat_id != *chat_id);
        state.messages.retain(|m| m.chat_id != *chat_id);
        state.chats.remove(chat_id);
        Ok(())
    }

    async fn upsert_vote(&self, vote: &Vote) -> Result<Vote, RepositoryError> {
        let mut state = self.state.lock().unwrap();
        if !state.chats.contains_key(&vote.chat_id) {
            return Err(missing_chat());
        }
        match state
            .votes
            .iter_mut()
            .find(|v| v.chat_id == vote.chat_id && v.message_id == vote.message_id)
        {
            Some(existing) => existing.is_upvoted = vote.is_upvoted,
            None => state.votes.push(vote.clone()),
        }
        Ok(vote.clone())
    }

    async fn list_votes(&self, chat_id: &Uuid) -> Result<Vec<Vote>, RepositoryError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .votes
            .iter()
            .filter(|v| v.chat_id == *chat_id)
            .cloned()
            .collect())
    }
}

impl MessageRepository for MemoryStore {
    async fn append(
        &self,
        chat_id: Uuid,
        role: MessageRole,
        content: String,
        attachments: Vec<Attachment>,
    ) -> Result<Message, RepositoryError> {
        if role == MessageRole::Assistant && self.fail_assistant_appends.load(Ordering::SeqCst) {
            return Err(RepositoryError::Query("disk I/O error".to_string()));
        }

        let mut state = self.state.lock().unwrap();
        if !state.chats.contains_key(&chat_id) {
            return Err(missing_chat());
        }

        let newest = state
            .messages
            .iter()
            .filter(|m| m.chat_id == chat_id)
            .map(|m| m.created_at)
            .max();
        let mut created_at = Utc::now();
        if let Some(newest) = newest {
            if created_at <= newest {
                created_at = newest + Duration::microseconds(1);
            }
        }

        let message = Message {
            id: Uuid::now_v7(),
            chat_id,
            role,
            parts: Message::compose_parts(content, attachments),
            created_at,
        };
        state.messages.push(message.clone());
        Ok(message)
    }

    async fn recent_context(
        &self,
        chat_id: &Uuid,
        limit: u32,
    ) -> Result<Vec<Message>, RepositoryError> {
        let messages = self.messages_of(chat_id);
        let skip = messages.len().saturating_sub(limit as usize);
        Ok(messages.into_iter().skip(skip).collect())
    }

    async fn list_messages(
        &self,
        chat_id: &Uuid,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<Message>, RepositoryError> {
        Ok(page(self.messages_of(chat_id), limit, offset))
    }

    async fn get_message(
        &self,
        chat_id: &Uuid,
        message_id: &Uuid,
    ) -> Result<Option<Message>, RepositoryError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .messages
            .iter()
            .find(|m| m.id == *message_id && m.chat_id == *chat_id)
            .cloned())
    }

    async fn latest_assistant_since(
        &self,
        chat_id: &Uuid,
        since: DateTime<Utc>,
    ) -> Result<Option<Message>, RepositoryError> {
        Ok(self
            .messages_of(chat_id)
            .into_iter()
            .rev()
            .find(|m| m.role == MessageRole::Assistant && m.created_at >= since))
    }

    async fn delete_all(&self, chat_id: &Uuid) -> Result<u64, RepositoryError> {
        let mut state = self.state.lock().unwrap();
        let before = state.messages.len();
        state.messages.retain(|m| m.chat_id != *chat_id);
        Ok((before - state.messages.len()) as u64)
    }
}

impl StreamRepository for MemoryStore {
    async fn open(&self, chat_id: &Uuid) -> Result<StreamHandle, RepositoryError> {
        let mut state = self.state.lock().unwrap();
        if !state.chats.contains_key(chat_id) {
            return Err(missing_chat());
        }
        let handle = StreamHandle {
            id: Uuid::now_v7(),
            chat_id: *chat_id,
            created_at: Utc::now(),
        };
        state.streams.push(handle.clone());
        Ok(handle)
    }

    async fn latest(&self, chat_id: &Uuid) -> Result<Option<StreamHandle>, RepositoryError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .streams
            .iter()
            .filter(|s| s.chat_id == *chat_id)
            .max_by_key(|s| s.created_at)
            .cloned())
    }
}

impl DocumentRepository for MemoryStore {
    async fn get_document(&self, document_id: &Uuid) -> Result<Option<Document>, RepositoryError> {
        Ok(self.state.lock().unwrap().documents.get(document_id).cloned())
    }
}

/// Generation provider that replays a fixed script.
#[derive(Clone, Default)]
pub struct ScriptedProvider {
    fragments: Vec<String>,
    usage: Option<Usage>,
    failure: Option<String>,
    unreachable: bool,
    gate: Option<Arc<Notify>>,
    requests: Arc<Mutex<Vec<GenerationRequest>>>,
}

impl ScriptedProvider {
    pub fn fragments(fragments: &[&str]) -> Self {
        Self {
            fragments: fragments.iter().map(|f| f.to_string()).collect(),
            ..Self::default()
        }
    }

    /// Report `total_tokens` after the last fragment.
    pub fn with_usage(mut self, total_tokens: u32) -> Self {
        self.usage = Some(Usage {
            input_tokens: 0,
            output_tokens: total_tokens,
            total_tokens,
        });
        self
    }

    /// Fail with a stream error after the scripted fragments.
    pub fn failing_with(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    /// Fail every `ping` with an authentication error.
    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    /// Hold the stream until the returned `Notify` is signalled.
    pub fn gated(mut self) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        self.gate = Some(Arc::clone(&gate));
        (self, gate)
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl GenerationProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn stream(&self, request: GenerationRequest) -> GenerationStream {
        self.requests.lock().unwrap().push(request);

        let fragments = self.fragments.clone();
        let usage = self.usage;
        let failure = self.failure.clone();
        let gate = self.gate.clone();

        Box::pin(async_stream::stream! {
            if let Some(gate) = gate {
                gate.notified().await;
            }
            for text in fragments {
                yield Ok(GenerationEvent::Fragment { text });
            }
            if let Some(message) = failure {
                yield Err(GenerationError::Stream(message));
                return;
            }
            if let Some(usage) = usage {
                yield Ok(GenerationEvent::Usage(usage));
            }
        })
    }

    async fn ping(&self) -> Result<(), GenerationError> {
        if self.unreachable {
            return Err(GenerationError::AuthenticationFailed);
        }
        Ok(())
    }
}
