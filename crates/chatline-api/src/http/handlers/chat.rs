//! Chat endpoints: the SSE generation stream, resume, and chat records.
//!
//! - POST   /api/chat                  - start or continue a chat (SSE)
//! - GET    /api/chat/{id}             - fetch a chat
//! - DELETE /api/chat/{id}             - delete a chat and everything in it
//! - PATCH  /api/chat/{id}/visibility  - change visibility
//! - GET    /api/chat/{id}/messages    - list messages
//! - GET    /api/chat/{id}/stream      - resume the latest generation
//!
//! SSE event types:
//! - `content` - incremental text: `{ "text": "..." }`
//! - `error`   - terminal failure: `{ "message": "..." }`
//!
//! A stream is zero or more `content` events followed by either the end of
//! the stream or exactly one `error` event.

use std::convert::Infallible;
use std::time::{Duration, Instant};

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use futures_util::Stream;
use serde::Deserialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use chatline_core::chat::service::StartChatRequest;
use chatline_types::chat::{Chat, Visibility};
use chatline_types::message::{Attachment, ContentPart, Message};
use chatline_types::stream::{ResumeOutcome, StreamFrame};

use crate::http::error::AppError;
use crate::http::extractors::auth::AuthUser;
use crate::http::extractors::query::PageQuery;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Response header carrying the (possibly newly created) chat id.
pub const CHAT_ID_HEADER: &str = "x-chat-id";

/// One message as sent by the client.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingMessage {
    /// Defaults to `user`.
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub parts: Vec<ContentPart>,
    #[serde(default, alias = "experimental_attachments")]
    pub attachments: Vec<Attachment>,
}

impl IncomingMessage {
    fn is_user(&self) -> bool {
        self.role
            .as_deref()
            .is_none_or(|role| role.eq_ignore_ascii_case("user"))
    }

    /// Split into the turn's text and its attachments.
    ///
    /// `content` wins over text parts; attachment parts are appended after
    /// the explicit `attachments` list.
    fn into_turn(self) -> (String, Vec<Attachment>) {
        let mut attachments = self.attachments;
        let mut texts = Vec::new();
        for part in self.parts {
            match part {
                ContentPart::Text { text } => texts.push(text),
                ContentPart::Attachment(a) => attachments.push(a),
            }
        }
        let content = self.content.unwrap_or_else(|| texts.join("\n"));
        (content, attachments)
    }
}

/// Request body for `POST /api/chat`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequestBody {
    /// Chat to continue; a new chat is created under this id (or a fresh one) otherwise.
    pub id: Option<Uuid>,
    pub message: Option<IncomingMessage>,
    /// Full client-side transcript; only the last user turn is new.
    pub messages: Option<Vec<IncomingMessage>>,
    pub selected_chat_model: Option<String>,
    pub selected_visibility_type: Option<Visibility>,
}

impl ChatRequestBody {
    /// Convert into a service request, picking the new user turn.
    fn into_start_request(self) -> Result<StartChatRequest, AppError> {
        let message = match (self.message, self.messages) {
            (Some(message), _) => message,
            (None, Some(messages)) => messages
                .into_iter()
                .rev()
                .find(IncomingMessage::is_user)
                .ok_or_else(|| AppError::Validation("no user message in 'messages'".to_string()))?,
            (None, None) => {
                return Err(AppError::Validation(
                    "either 'message' or 'messages' is required".to_string(),
                ));
            }
        };

        if !message.is_user() {
            return Err(AppError::Validation("message role must be 'user'".to_string()));
        }

        let (content, attachments) = message.into_turn();
        Ok(StartChatRequest {
            chat_id: self.id,
            content,
            attachments,
            model: self.selected_chat_model,
            visibility: self.selected_visibility_type,
        })
    }
}

/// Encode one frame as an SSE event.
fn frame_event(frame: StreamFrame) -> Event {
    match frame {
        StreamFrame::Content { text } => Event::default()
            .event("content")
            .data(serde_json::json!({ "text": text }).to_string()),
        StreamFrame::Error { message } => Event::default()
            .event("error")
            .data(serde_json::json!({ "message": message }).to_string()),
    }
}

/// Relay frames from the generation task to the client.
///
/// Dropping the returned stream (client disconnect) drops the receiver; the
/// generation keeps running and still commits its result.
fn frame_stream(
    mut frames: mpsc::Receiver<StreamFrame>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    async_stream::stream! {
        while let Some(frame) = frames.recv().await {
            let terminal = frame.is_terminal();
            yield Ok::<_, Infallible>(frame_event(frame));
            if terminal {
                break;
            }
        }
    }
}

fn sse_response<S>(chat_id: Uuid, stream: S) -> Response
where
    S: Stream<Item = Result<Event, Infallible>> + Send + 'static,
{
    (
        [(CHAT_ID_HEADER, chat_id.to_string())],
        Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15))),
    )
        .into_response()
}

/// POST /api/chat - Append a user turn and stream the reply as SSE.
///
/// Ownership, validation, model and lock failures are returned as JSON
/// errors before the stream starts. Provider failures arrive in-band as a
/// terminal `error` event.
pub async fn post_chat(
    State(state): State<AppState>,
    AuthUser(auth): AuthUser,
    Json(body): Json<ChatRequestBody>,
) -> Result<Response, AppError> {
    let request = body.into_start_request()?;
    let handle = state.chat_service.start_or_continue(&auth, request).await?;

    tracing::debug!(
        chat_id = %handle.chat_id,
        stream_id = %handle.stream_id,
        model = %handle.model,
        "Streaming generation to client"
    );

    Ok(sse_response(handle.chat_id, frame_stream(handle.frames)))
}

/// GET /api/chat/{id} - Fetch a chat. Public chats are readable by anyone.
pub async fn get_chat(
    State(state): State<AppState>,
    AuthUser(auth): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Chat>>, AppError> {
    let start = Instant::now();
    let chat = state.chat_service.get_chat(&auth, &id).await?;
    Ok(ApiResponse::timed(chat, start))
}

/// DELETE /api/chat/{id} - Delete a chat with its messages, streams, and votes.
pub async fn delete_chat(
    State(state): State<AppState>,
    AuthUser(auth): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Chat>>, AppError> {
    let start = Instant::now();
    let chat = state.chat_service.delete_chat(&auth, &id).await?;
    Ok(ApiResponse::timed(chat, start))
}

#[derive(Debug, Deserialize)]
pub struct VisibilityBody {
    pub visibility: Visibility,
}

/// PATCH /api/chat/{id}/visibility - Change a chat's visibility (owner only).
pub async fn update_visibility(
    State(state): State<AppState>,
    AuthUser(auth): AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<VisibilityBody>,
) -> Result<Json<ApiResponse<Chat>>, AppError> {
    let start = Instant::now();
    let chat = state
        .chat_service
        .update_visibility(&auth, &id, body.visibility)
        .await?;
    Ok(ApiResponse::timed(chat, start))
}

/// GET /api/chat/{id}/messages - List a chat's messages, oldest first.
pub async fn list_messages(
    State(state): State<AppState>,
    AuthUser(auth): AuthUser,
    Path(id): Path<Uuid>,
    Query(page): Query<PageQuery>,
) -> Result<Json<ApiResponse<Vec<Message>>>, AppError> {
    let start = Instant::now();
    let messages = state
        .chat_service
        .list_messages(&auth, &id, page.limit, page.offset)
        .await?;
    Ok(ApiResponse::timed(messages, start))
}

/// GET /api/chat/{id}/stream - Resume the chat's latest generation.
///
/// - completed: SSE with a single `content` event carrying the full reply
/// - in progress: `202 Accepted` with `{ "streamId": "..." }`
/// - nothing to resume: `204 No Content`
pub async fn resume_stream(
    State(state): State<AppState>,
    AuthUser(auth): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let start = Instant::now();
    match state.chat_service.resume_stream(&auth, &id).await? {
        ResumeOutcome::Nothing => Ok(StatusCode::NO_CONTENT.into_response()),
        ResumeOutcome::InProgress(handle) => {
            let body = serde_json::json!({ "streamId": handle.id, "status": "in_progress" });
            Ok((StatusCode::ACCEPTED, ApiResponse::timed(body, start)).into_response())
        }
        ResumeOutcome::Completed { handle, message } => {
            tracing::debug!(chat_id = %id, stream_id = %handle.id, "Resuming completed stream");
            let event = frame_event(StreamFrame::content(message.text()));
            let stream = futures_util::stream::once(async move { Ok::<_, Infallible>(event) });
            Ok(sse_response(id, stream))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> ChatRequestBody {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_single_message_body() {
        let request = parse(
            r#"{"id":"0192d7b0-0000-7000-8000-000000000001","message":{"role":"user","content":"hello"},"selectedChatModel":"chat-model","selectedVisibilityType":"public"}"#,
        )
        .into_start_request()
        .unwrap();
        assert_eq!(request.content, "hello");
        assert_eq!(request.model.as_deref(), Some("chat-model"));
        assert_eq!(request.visibility, Some(Visibility::Public));
        assert!(request.chat_id.is_some());
    }

    #[test]
    fn test_messages_body_takes_last_user_turn() {
        let request = parse(
            r#"{"messages":[
                {"role":"user","content":"first"},
                {"role":"assistant","content":"reply"},
                {"role":"user","content":"second"},
                {"role":"assistant","content":"partial"}
            ]}"#,
        )
        .into_start_request()
        .unwrap();
        assert_eq!(request.content, "second");
    }

    #[test]
    fn test_parts_supply_text_and_attachments() {
        let request = parse(
            r#"{"message":{"parts":[
                {"type":"text","text":"see"},
                {"type":"attachment","url":"https://f.example.com/a.png","name":"a.png","mediaType":"image/png"}
            ]}}"#,
        )
        .into_start_request()
        .unwrap();
        assert_eq!(request.content, "see");
        assert_eq!(request.attachments.len(), 1);
        assert_eq!(request.attachments[0].name, "a.png");
    }

    #[test]
    fn test_body_without_message_is_rejected() {
        let err = parse("{}").into_start_request().unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_assistant_message_is_rejected() {
        let err = parse(r#"{"message":{"role":"assistant","content":"x"}}"#)
            .into_start_request()
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
