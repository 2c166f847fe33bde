//! Chat session façade.
//!
//! `ChatSessionService` is what the transport layer calls. It composes the
//! ownership guard, the per-chat locks, the model registry, and the
//! generation orchestrator into the chat operations: start-or-continue,
//! resume, delete, history, visibility, and votes.
//!
//! Every method takes an explicit `AuthContext`; nothing reads ambient
//! request state.

use std::sync::Arc;
use std::time::Duration;

use chrono::{SubsecRound, Utc};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;
use tracing::{Instrument, debug, info, info_span};
use uuid::Uuid;

use chatline_types::chat::{Chat, Visibility, Vote, derive_title};
use chatline_types::config::AppConfig;
use chatline_types::document::Document;
use chatline_types::error::{ChatError, RepositoryError};
use chatline_types::llm::ModelInfo;
use chatline_types::message::{Attachment, Message};
use chatline_types::stream::{ResumeOutcome, StreamFrame};
use chatline_types::user::AuthContext;

use super::lock::ChatLocks;
use super::orchestrator::{GenerationOrchestrator, GenerationOutcome};
use crate::llm::registry::{ModelCheck, ModelRegistry};
use crate::ownership::{Access, Ownership, OwnershipGuard};
use crate::repository::chat::ChatRepository;
use crate::repository::document::DocumentRepository;
use crate::repository::message::MessageRepository;
use crate::repository::stream::StreamRepository;

/// A new user turn, as received from the transport layer.
#[derive(Debug, Clone, Default)]
pub struct StartChatRequest {
    /// Chat to continue, or the id to create a new chat under.
    pub chat_id: Option<Uuid>,
    pub content: String,
    pub attachments: Vec<Attachment>,
    /// Public model id; `None` selects the configured default.
    pub model: Option<String>,
    /// Visibility for a newly created chat. Ignored for existing chats.
    pub visibility: Option<Visibility>,
}

/// A running generation.
///
/// `frames` yields content frames in arrival order and at most one terminal
/// error frame; it closes when the generation task finishes. `completion`
/// resolves once the reply is committed (or the attempt failed), even if
/// `frames` was dropped early.
#[derive(Debug)]
pub struct GenerationHandle {
    pub chat_id: Uuid,
    pub stream_id: Uuid,
    pub model: String,
    pub frames: mpsc::Receiver<StreamFrame>,
    pub completion: JoinHandle<GenerationOutcome>,
}

/// Entry point for every chat operation.
pub struct ChatSessionService<C, M, S, D> {
    chats: Arc<C>,
    messages: Arc<M>,
    streams: Arc<S>,
    guard: OwnershipGuard<C, D>,
    orchestrator: GenerationOrchestrator<C, M, S>,
    registry: Arc<ModelRegistry>,
    locks: Arc<ChatLocks>,
    tracker: TaskTracker,
    lock_timeout: Duration,
    channel_capacity: usize,
    title_max_chars: usize,
}

fn not_found_as(kind: &'static str) -> impl FnOnce(RepositoryError) -> ChatError {
    move |e| match e {
        RepositoryError::NotFound => ChatError::NotFound(kind),
        other => ChatError::StoreFailure(other),
    }
}

impl<C, M, S, D> ChatSessionService<C, M, S, D>
where
    C: ChatRepository + 'static,
    M: MessageRepository + 'static,
    S: StreamRepository + 'static,
    D: DocumentRepository + 'static,
{
    pub fn new(
        chats: Arc<C>,
        messages: Arc<M>,
        streams: Arc<S>,
        documents: Arc<D>,
        registry: Arc<ModelRegistry>,
        config: &AppConfig,
    ) -> Self {
        let guard = OwnershipGuard::new(Arc::clone(&chats), documents);
        let orchestrator = GenerationOrchestrator::new(
            Arc::clone(&chats),
            Arc::clone(&messages),
            Arc::clone(&streams),
            config.context_limit,
            config.system_prompt.clone(),
        );

        Self {
            chats,
            messages,
            streams,
            guard,
            orchestrator,
            registry,
            locks: Arc::new(ChatLocks::new()),
            tracker: TaskTracker::new(),
            lock_timeout: Duration::from_secs(config.generation.lock_timeout_secs),
            channel_capacity: config.generation.channel_capacity.max(1),
            title_max_chars: config.title_max_chars,
        }
    }

    // --- Generation ---

    /// Append a user turn to a chat (creating the chat if needed) and start
    /// generating the reply.
    ///
    /// All rejections (bad input, unknown model, ownership, `Busy`) happen
    /// before the user turn is recorded. Once this returns `Ok`, the outcome
    /// of the generation is only reported through the handle.
    pub async fn start_or_continue(
        &self,
        auth: &AuthContext,
        request: StartChatRequest,
    ) -> Result<GenerationHandle, ChatError> {
        if request.content.trim().is_empty() && request.attachments.is_empty() {
            return Err(ChatError::BadRequest(
                "message must contain text or attachments".to_string(),
            ));
        }

        let resolved = self.registry.resolve(request.model.as_deref())?;
        let chat_id = request.chat_id.unwrap_or_else(Uuid::now_v7);

        // Other users' chats are rejected before queueing on the lock.
        if let Ownership::Forbidden = self.guard.check_chat(auth, &chat_id, Access::Write).await? {
            return Err(ChatError::Forbidden("chat"));
        }

        let lock = self.locks.acquire(chat_id, self.lock_timeout).await?;

        // Re-checked under the lock: the chat may have been created or
        // deleted while this request waited.
        let chat = match self.guard.check_chat(auth, &chat_id, Access::Write).await? {
            Ownership::Authorized(chat) => chat,
            Ownership::Forbidden => return Err(ChatError::Forbidden("chat")),
            Ownership::NotFound => {
                let chat = Chat {
                    id: chat_id,
                    owner_id: auth.user_id,
                    title: derive_title(&request.content, self.title_max_chars),
                    visibility: request.visibility.unwrap_or_default(),
                    last_usage: None,
                    created_at: Utc::now().trunc_subsecs(6),
                };
                match self.chats.create_chat(&chat).await {
                    Ok(chat) => {
                        info!(chat_id = %chat.id, owner = %auth.user_id, "Chat created");
                        chat
                    }
                    // Lost a creation race against another process.
                    Err(RepositoryError::Conflict(_)) => self
                        .guard
                        .check_chat(auth, &chat_id, Access::Write)
                        .await?
                        .into_result("chat")?,
                    Err(e) => return Err(e.into()),
                }
            }
        };

        let assembled = self
            .orchestrator
            .assemble(chat, request.content, request.attachments)
            .await?;

        let (tx, rx) = mpsc::channel(self.channel_capacity);
        let stream_id = assembled.handle.id;
        let model_id = resolved.info.id.clone();

        let span = info_span!(
            "gen_ai.generate",
            chat_id = %chat_id,
            stream_id = %stream_id,
            gen_ai.system = resolved.provider.name(),
            gen_ai.request.model = %resolved.info.model,
        );

        let orchestrator = self.orchestrator.clone();
        let completion = self.tracker.spawn(
            async move {
                // Held until the reply is committed or the attempt failed.
                let _lock = lock;
                orchestrator
                    .stream_and_commit(assembled, &resolved.provider, &resolved.info.model, tx)
                    .await
            }
            .instrument(span),
        );

        debug!(chat_id = %chat_id, stream_id = %stream_id, model = %model_id, "Generation started");

        Ok(GenerationHandle {
            chat_id,
            stream_id,
            model: model_id,
            frames: rx,
            completion,
        })
    }

    /// Report what became of the chat's most recent generation attempt.
    pub async fn resume_stream(
        &self,
        auth: &AuthContext,
        chat_id: &Uuid,
    ) -> Result<ResumeOutcome, ChatError> {
        self.guard
            .check_chat(auth, chat_id, Access::Read)
            .await?
            .into_result("chat")?;

        let Some(handle) = self.streams.latest(chat_id).await? else {
            return Ok(ResumeOutcome::Nothing);
        };

        if self.locks.is_locked(chat_id) {
            return Ok(ResumeOutcome::InProgress(handle));
        }

        match self
            .messages
            .latest_assistant_since(chat_id, handle.created_at)
            .await?
        {
            Some(message) => Ok(ResumeOutcome::Completed { handle, message }),
            None => Ok(ResumeOutcome::Nothing),
        }
    }

    // --- Chat records ---

    pub async fn get_chat(&self, auth: &AuthContext, chat_id: &Uuid) -> Result<Chat, ChatError> {
        self.guard
            .check_chat(auth, chat_id, Access::Read)
            .await?
            .into_result("chat")
    }

    pub async fn list_messages(
        &self,
        auth: &AuthContext,
        chat_id: &Uuid,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<Message>, ChatError> {
        self.get_chat(auth, chat_id).await?;
        Ok(self.messages.list_messages(chat_id, limit, offset).await?)
    }

    /// The caller's own chats, newest first.
    pub async fn list_history(
        &self,
        auth: &AuthContext,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<Chat>, ChatError> {
        Ok(self.chats.list_chats(&auth.user_id, limit, offset).await?)
    }

    pub async fn update_visibility(
        &self,
        auth: &AuthContext,
        chat_id: &Uuid,
        visibility: Visibility,
    ) -> Result<Chat, ChatError> {
        let mut chat = self
            .guard
            .check_chat(auth, chat_id, Access::Write)
            .await?
            .into_result("chat")?;

        self.chats
            .update_visibility(chat_id, visibility)
            .await
            .map_err(not_found_as("chat"))?;
        chat.visibility = visibility;

        info!(chat_id = %chat_id, %visibility, "Chat visibility updated");
        Ok(chat)
    }

    /// Delete a chat with its messages, stream handles, and votes.
    ///
    /// Waits for a running generation on the chat to finish first.
    pub async fn delete_chat(&self, auth: &AuthContext, chat_id: &Uuid) -> Result<Chat, ChatError> {
        let chat = self
            .guard
            .check_chat(auth, chat_id, Access::Write)
            .await?
            .into_result("chat")?;

        let _lock = self.locks.acquire(*chat_id, self.lock_timeout).await?;
        self.chats
            .delete_chat(chat_id)
            .await
            .map_err(not_found_as("chat"))?;

        info!(chat_id = %chat_id, "Chat deleted");
        Ok(chat)
    }

    /// Fetch a document the caller owns.
    pub async fn get_document(
        &self,
        auth: &AuthContext,
        document_id: &Uuid,
    ) -> Result<Document, ChatError> {
        self.guard
            .check_document(auth, document_id)
            .await?
            .into_result("document")
    }

    // --- Votes ---

    /// Record the owner's vote on one message of the chat.
    pub async fn vote(
        &self,
        auth: &AuthContext,
        chat_id: &Uuid,
        message_id: &Uuid,
        is_upvoted: bool,
    ) -> Result<Vote, ChatError> {
        self.guard
            .check_chat(auth, chat_id, Access::Write)
            .await?
            .into_result("chat")?;

        if self.messages.get_message(chat_id, message_id).await?.is_none() {
            return Err(ChatError::NotFound("message"));
        }

        let vote = Vote {
            chat_id: *chat_id,
            message_id: *message_id,
            is_upvoted,
        };
        Ok(self.chats.upsert_vote(&vote).await?)
    }

    /// Votes on a chat. Only the owner sees them, even on public chats.
    pub async fn list_votes(&self, auth: &AuthContext, chat_id: &Uuid) -> Result<Vec<Vote>, ChatError> {
        self.guard
            .check_chat(auth, chat_id, Access::Write)
            .await?
            .into_result("chat")?;
        Ok(self.chats.list_votes(chat_id).await?)
    }

    // --- Models & lifecycle ---

    pub fn models(&self) -> Vec<ModelInfo> {
        self.registry.list()
    }

    pub fn default_model(&self) -> &str {
        self.registry.default_model()
    }

    /// Verify credentials and connectivity of every registered model.
    pub async fn check_models(&self) -> Vec<ModelCheck> {
        self.registry.check_all().await
    }

    /// Stop accepting generations and wait for in-flight ones to commit.
    pub async fn shutdown(&self) {
        self.tracker.close();
        info!(in_flight = self.tracker.len(), "Waiting for in-flight generations");
        self.tracker.wait().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::box_provider::BoxGenerationProvider;
    use crate::testing::{MemoryStore, ScriptedProvider, alice, bob};
    use chatline_types::chat::ChatUsage;
    use chatline_types::message::MessageRole;

    type Service = ChatSessionService<MemoryStore, MemoryStore, MemoryStore, MemoryStore>;

    fn model(id: &str) -> ModelInfo {
        ModelInfo {
            id: id.to_string(),
            provider: "scripted".to_string(),
            model: format!("{id}-upstream"),
        }
    }

    fn service_with(store: &Arc<MemoryStore>, provider: ScriptedProvider, config: AppConfig) -> Service {
        let mut registry = ModelRegistry::new("chat-model");
        registry.register(model("chat-model"), BoxGenerationProvider::new(provider));
        ChatSessionService::new(
            Arc::clone(store),
            Arc::clone(store),
            Arc::clone(store),
            Arc::clone(store),
            Arc::new(registry),
            &config,
        )
    }

    fn service(store: &Arc<MemoryStore>, provider: ScriptedProvider) -> Service {
        service_with(store, provider, AppConfig::default())
    }

    fn turn(chat_id: Option<Uuid>, content: &str) -> StartChatRequest {
        StartChatRequest {
            chat_id,
            content: content.to_string(),
            ..StartChatRequest::default()
        }
    }

    async fn collect(handle: GenerationHandle) -> (Vec<StreamFrame>, GenerationOutcome) {
        let GenerationHandle {
            mut frames,
            completion,
            ..
        } = handle;
        let mut out = Vec::new();
        while let Some(frame) = frames.recv().await {
            out.push(frame);
        }
        (out, completion.await.unwrap())
    }

    #[tokio::test]
    async fn test_first_turn_creates_chat_and_commits_reply() {
        let store = Arc::new(MemoryStore::default());
        let svc = service(&store, ScriptedProvider::fragments(&["Hi", " there"]).with_usage(12));
        let c1 = Uuid::now_v7();

        let handle = svc.start_or_continue(&alice(), turn(Some(c1), "hello")).await.unwrap();
        assert_eq!(handle.chat_id, c1);
        assert_eq!(handle.model, "chat-model");
        let (frames, outcome) = collect(handle).await;

        assert_eq!(
            frames,
            vec![StreamFrame::content("Hi"), StreamFrame::content(" there")]
        );
        assert!(outcome.is_committed());

        let chat = store.chat(&c1).unwrap();
        assert_eq!(chat.owner_id, alice().user_id);
        assert_eq!(chat.title, "hello");
        assert_eq!(chat.visibility, Visibility::Private);
        assert_eq!(chat.last_usage, Some(ChatUsage { total_tokens: 12 }));

        let history = store.messages_of(&c1);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, MessageRole::User);
        assert_eq!(history[0].text(), "hello");
        assert_eq!(history[1].role, MessageRole::Assistant);
        assert_eq!(history[1].text(), "Hi there");
        assert_eq!(store.stream_count(&c1), 1);
    }

    #[tokio::test]
    async fn test_other_user_is_forbidden_and_nothing_changes() {
        let store = Arc::new(MemoryStore::default());
        let svc = service(&store, ScriptedProvider::fragments(&["Hi"]));
        let c1 = Uuid::now_v7();
        collect(svc.start_or_continue(&alice(), turn(Some(c1), "hello")).await.unwrap()).await;

        let result = svc.start_or_continue(&bob(), turn(Some(c1), "mine now")).await;
        assert!(matches!(result, Err(ChatError::Forbidden("chat"))));
        assert_eq!(store.messages_of(&c1).len(), 2);
        assert_eq!(store.stream_count(&c1), 1);
        assert_eq!(store.chat(&c1).unwrap().owner_id, alice().user_id);
    }

    #[tokio::test]
    async fn test_provider_failure_keeps_user_turn_only() {
        let store = Arc::new(MemoryStore::default());
        let svc = service(
            &store,
            ScriptedProvider::fragments(&["Par"]).failing_with("upstream reset"),
        );
        let c2 = Uuid::now_v7();

        let handle = svc.start_or_continue(&alice(), turn(Some(c2), "tell me")).await.unwrap();
        let (frames, outcome) = collect(handle).await;

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0], StreamFrame::content("Par"));
        assert!(frames[1].is_terminal());
        assert!(matches!(outcome, GenerationOutcome::Failed { .. }));

        let history = store.messages_of(&c2);
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].role, MessageRole::User);

        let resumed = svc.resume_stream(&alice(), &c2).await.unwrap();
        assert!(matches!(resumed, ResumeOutcome::Nothing));
    }

    #[tokio::test]
    async fn test_rejections_happen_before_user_turn() {
        let store = Arc::new(MemoryStore::default());
        let svc = service(&store, ScriptedProvider::fragments(&["x"]));
        let chat_id = Uuid::now_v7();

        let mut unknown = turn(Some(chat_id), "hi");
        unknown.model = Some("gpt-17".to_string());
        let result = svc.start_or_continue(&alice(), unknown).await;
        assert!(matches!(result, Err(ChatError::BadRequest(_))));

        let result = svc.start_or_continue(&alice(), turn(Some(chat_id), "   ")).await;
        assert!(matches!(result, Err(ChatError::BadRequest(_))));

        assert!(store.chat(&chat_id).is_none());
        assert!(store.messages_of(&chat_id).is_empty());
    }

    #[tokio::test]
    async fn test_new_chat_without_id_uses_requested_visibility() {
        let store = Arc::new(MemoryStore::default());
        let svc = service(&store, ScriptedProvider::fragments(&["ok"]));

        let mut request = turn(None, &"x".repeat(150));
        request.visibility = Some(Visibility::Public);
        let handle = svc.start_or_continue(&alice(), request).await.unwrap();
        let chat_id = handle.chat_id;
        collect(handle).await;

        let chat = store.chat(&chat_id).unwrap();
        assert_eq!(chat.visibility, Visibility::Public);
        assert_eq!(chat.title.chars().count(), 100);
    }

    #[tokio::test]
    async fn test_concurrent_generation_on_same_chat_is_busy() {
        let store = Arc::new(MemoryStore::default());
        let (provider, gate) = ScriptedProvider::fragments(&["slow"]).gated();
        let mut config = AppConfig::default();
        config.generation.lock_timeout_secs = 0;
        let svc = service_with(&store, provider, config);
        let chat_id = Uuid::now_v7();

        let first = svc.start_or_continue(&alice(), turn(Some(chat_id), "one")).await.unwrap();
        let second = svc.start_or_continue(&alice(), turn(Some(chat_id), "two")).await;
        assert!(matches!(second, Err(ChatError::Busy)));

        gate.notify_one();
        let (_, outcome) = collect(first).await;
        assert!(outcome.is_committed());
        assert_eq!(store.messages_of(&chat_id).len(), 2);
    }

    #[tokio::test]
    async fn test_other_user_is_forbidden_without_waiting_on_lock() {
        let store = Arc::new(MemoryStore::default());
        let (provider, gate) = ScriptedProvider::fragments(&["slow"]).gated();
        let mut config = AppConfig::default();
        config.generation.lock_timeout_secs = 30;
        let svc = service_with(&store, provider, config);
        let chat_id = Uuid::now_v7();

        let first = svc.start_or_continue(&alice(), turn(Some(chat_id), "mine")).await.unwrap();

        let intruder = tokio::time::timeout(
            Duration::from_millis(500),
            svc.start_or_continue(&bob(), turn(Some(chat_id), "let me in")),
        )
        .await
        .expect("non-owner must not queue on the chat lock");
        assert!(matches!(intruder, Err(ChatError::Forbidden("chat"))));

        gate.notify_one();
        let (_, outcome) = collect(first).await;
        assert!(outcome.is_committed());
        assert_eq!(store.messages_of(&chat_id).len(), 2);
        assert_eq!(store.stream_count(&chat_id), 1);
    }

    #[tokio::test]
    async fn test_resume_reports_in_progress_then_completed() {
        let store = Arc::new(MemoryStore::default());
        let (provider, gate) = ScriptedProvider::fragments(&["done"]).gated();
        let svc = service(&store, provider);
        let chat_id = Uuid::now_v7();

        assert!(matches!(
            svc.resume_stream(&alice(), &chat_id).await,
            Err(ChatError::NotFound("chat"))
        ));

        let handle = svc.start_or_continue(&alice(), turn(Some(chat_id), "go")).await.unwrap();
        let stream_id = handle.stream_id;
        match svc.resume_stream(&alice(), &chat_id).await.unwrap() {
            ResumeOutcome::InProgress(h) => assert_eq!(h.id, stream_id),
            other => panic!("expected InProgress, got {other:?}"),
        }

        gate.notify_one();
        collect(handle).await;

        match svc.resume_stream(&alice(), &chat_id).await.unwrap() {
            ResumeOutcome::Completed { handle, message } => {
                assert_eq!(handle.id, stream_id);
                assert_eq!(message.text(), "done");
            }
            other => panic!("expected Completed, got {other:?}"),
        }

        assert!(matches!(
            svc.resume_stream(&bob(), &chat_id).await,
            Err(ChatError::Forbidden("chat"))
        ));
    }

    #[tokio::test]
    async fn test_dropped_receiver_still_commits() {
        let store = Arc::new(MemoryStore::default());
        let svc = service(&store, ScriptedProvider::fragments(&["a", "b"]));
        let chat_id = Uuid::now_v7();

        let GenerationHandle { frames, completion, .. } =
            svc.start_or_continue(&alice(), turn(Some(chat_id), "go")).await.unwrap();
        drop(frames);

        assert!(completion.await.unwrap().is_committed());
        assert_eq!(store.messages_of(&chat_id)[1].text(), "ab");
    }

    #[tokio::test]
    async fn test_delete_cascades_and_checks_ownership() {
        let store = Arc::new(MemoryStore::default());
        let svc = service(&store, ScriptedProvider::fragments(&["reply"]));
        let chat_id = Uuid::now_v7();
        collect(svc.start_or_continue(&alice(), turn(Some(chat_id), "hi")).await.unwrap()).await;

        let assistant = store.messages_of(&chat_id)[1].clone();
        svc.vote(&alice(), &chat_id, &assistant.id, true).await.unwrap();
        assert_eq!(store.vote_count(&chat_id), 1);

        assert!(matches!(
            svc.delete_chat(&bob(), &chat_id).await,
            Err(ChatError::Forbidden("chat"))
        ));

        svc.delete_chat(&alice(), &chat_id).await.unwrap();
        assert!(store.chat(&chat_id).is_none());
        assert!(store.messages_of(&chat_id).is_empty());
        assert_eq!(store.stream_count(&chat_id), 0);
        assert_eq!(store.vote_count(&chat_id), 0);

        assert!(matches!(
            svc.delete_chat(&alice(), &chat_id).await,
            Err(ChatError::NotFound("chat"))
        ));
    }

    #[tokio::test]
    async fn test_vote_upserts_and_validates_message() {
        let store = Arc::new(MemoryStore::default());
        let svc = service(&store, ScriptedProvider::fragments(&["reply"]));
        let chat_id = Uuid::now_v7();
        collect(svc.start_or_continue(&alice(), turn(Some(chat_id), "hi")).await.unwrap()).await;
        let message_id = store.messages_of(&chat_id)[1].id;

        svc.vote(&alice(), &chat_id, &message_id, true).await.unwrap();
        svc.vote(&alice(), &chat_id, &message_id, false).await.unwrap();
        let votes = svc.list_votes(&alice(), &chat_id).await.unwrap();
        assert_eq!(votes.len(), 1);
        assert!(!votes[0].is_upvoted);

        assert!(matches!(
            svc.vote(&alice(), &chat_id, &Uuid::now_v7(), true).await,
            Err(ChatError::NotFound("message"))
        ));
        assert!(matches!(
            svc.vote(&bob(), &chat_id, &message_id, true).await,
            Err(ChatError::Forbidden("chat"))
        ));
    }

    #[tokio::test]
    async fn test_visibility_controls_read_access() {
        let store = Arc::new(MemoryStore::default());
        let svc = service(&store, ScriptedProvider::fragments(&["reply"]));
        let chat_id = Uuid::now_v7();
        collect(svc.start_or_continue(&alice(), turn(Some(chat_id), "hi")).await.unwrap()).await;

        assert!(matches!(
            svc.get_chat(&bob(), &chat_id).await,
            Err(ChatError::Forbidden("chat"))
        ));

        let chat = svc
            .update_visibility(&alice(), &chat_id, Visibility::Public)
            .await
            .unwrap();
        assert_eq!(chat.visibility, Visibility::Public);

        assert_eq!(svc.get_chat(&bob(), &chat_id).await.unwrap().id, chat_id);
        assert_eq!(
            svc.list_messages(&bob(), &chat_id, None, None).await.unwrap().len(),
            2
        );
        assert!(matches!(
            svc.update_visibility(&bob(), &chat_id, Visibility::Private).await,
            Err(ChatError::Forbidden("chat"))
        ));
        assert!(matches!(
            svc.list_votes(&bob(), &chat_id).await,
            Err(ChatError::Forbidden("chat"))
        ));
    }

    #[tokio::test]
    async fn test_history_lists_only_own_chats_newest_first() {
        let store = Arc::new(MemoryStore::default());
        let svc = service(&store, ScriptedProvider::fragments(&["r"]));

        let mut ids = Vec::new();
        for text in ["first", "second"] {
            let handle = svc.start_or_continue(&alice(), turn(None, text)).await.unwrap();
            ids.push(handle.chat_id);
            collect(handle).await;
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        collect(svc.start_or_continue(&bob(), turn(None, "other")).await.unwrap()).await;

        let history = svc.list_history(&alice(), None, None).await.unwrap();
        let titles: Vec<&str> = history.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["second", "first"]);
        assert_eq!(history[0].id, ids[1]);
    }

    #[tokio::test]
    async fn test_shutdown_waits_for_in_flight_generation() {
        let store = Arc::new(MemoryStore::default());
        let (provider, gate) = ScriptedProvider::fragments(&["late"]).gated();
        let svc = service(&store, provider);
        let chat_id = Uuid::now_v7();

        let handle = svc.start_or_continue(&alice(), turn(Some(chat_id), "go")).await.unwrap();
        drop(handle.frames);
        gate.notify_one();
        svc.shutdown().await;

        assert_eq!(store.messages_of(&chat_id).len(), 2);
    }

    #[tokio::test]
    async fn test_get_document_is_owner_only() {
        let store = Arc::new(MemoryStore::default());
        let svc = service(&store, ScriptedProvider::fragments(&["x"]));
        let doc = store.insert_document(alice().user_id, "Notes");

        let found = svc.get_document(&alice(), &doc.id).await.unwrap();
        assert_eq!(found.title, "Notes");
        assert!(matches!(
            svc.get_document(&bob(), &doc.id).await,
            Err(ChatError::Forbidden("document"))
        ));
        assert!(matches!(
            svc.get_document(&alice(), &Uuid::now_v7()).await,
            Err(ChatError::NotFound("document"))
        ));
    }
}
