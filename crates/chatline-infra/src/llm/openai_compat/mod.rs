//! OpenAI-compatible generation provider.
//!
//! A single [`OpenAiCompatibleProvider`] serves OpenAI, xAI, Gemini, Mistral
//! and any self-hosted gateway speaking the chat completions protocol, via a
//! configurable base URL.
//!
//! Uses [`async_openai`] for type-safe request/response handling and
//! built-in SSE streaming.

pub mod config;
pub mod streaming;

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestAssistantMessage, ChatCompletionRequestAssistantMessageContent,
    ChatCompletionRequestMessage, ChatCompletionRequestMessageContentPartImage,
    ChatCompletionRequestMessageContentPartText, ChatCompletionRequestSystemMessage,
    ChatCompletionRequestSystemMessageContent, ChatCompletionRequestUserMessage,
    ChatCompletionRequestUserMessageContent, ChatCompletionRequestUserMessageContentPart,
    ChatCompletionStreamOptions, CreateChatCompletionRequest, ImageUrl,
};
use secrecy::{ExposeSecret, SecretString};

use chatline_core::llm::provider::{GenerationProvider, GenerationStream};
use chatline_types::llm::{ContextMessage, GenerationError, GenerationRequest};
use chatline_types::message::{ContentPart, MessageRole};

use self::config::OpenAiCompatConfig;
use self::streaming::map_openai_stream;

/// Unified provider for any OpenAI-compatible API.
///
/// Does NOT derive Debug: the `async_openai::Client` holds the API key.
pub struct OpenAiCompatibleProvider {
    client: Client<OpenAIConfig>,
    provider_name: String,
    model: String,
}

impl OpenAiCompatibleProvider {
    /// Create a new OpenAI-compatible provider from a configuration.
    pub fn new(config: OpenAiCompatConfig) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(config.api_key.expose_secret())
            .with_api_base(&config.base_url);

        Self {
            client: Client::with_config(openai_config),
            provider_name: config.provider_name,
            model: config.model,
        }
    }

    /// Create an OpenAI provider.
    pub fn openai(api_key: SecretString, model: &str) -> Self {
        Self::new(config::openai_defaults(api_key, model))
    }

    /// Create an xAI provider.
    pub fn xai(api_key: SecretString, model: &str) -> Self {
        Self::new(config::xai_defaults(api_key, model))
    }

    /// Build a [`CreateChatCompletionRequest`] from a [`GenerationRequest`].
    fn build_request(&self, request: &GenerationRequest, stream: bool) -> CreateChatCompletionRequest {
        let mut messages: Vec<ChatCompletionRequestMessage> =
            Vec::with_capacity(request.messages.len() + 1);

        if let Some(ref system) = request.system {
            messages.push(ChatCompletionRequestMessage::System(
                ChatCompletionRequestSystemMessage {
                    content: ChatCompletionRequestSystemMessageContent::Text(system.clone()),
                    name: None,
                },
            ));
        }

        for msg in &request.messages {
            messages.push(map_context_message(msg));
        }

        // Use the model from the request if set, otherwise fall back to config default
        let model = if request.model.is_empty() {
            self.model.clone()
        } else {
            request.model.clone()
        };

        let mut req = CreateChatCompletionRequest {
            model,
            messages,
            ..Default::default()
        };

        if stream {
            req.stream = Some(true);
            req.stream_options = Some(ChatCompletionStreamOptions {
                include_usage: Some(true),
                include_obfuscation: None,
            });
        }

        req
    }
}

/// Map one context entry to an OpenAI message.
///
/// User turns with attachments become multi-part content: images are sent
/// as `image_url` parts, other files as a markdown link in a text part.
/// Assistant turns are always plain text.
fn map_context_message(msg: &ContextMessage) -> ChatCompletionRequestMessage {
    match msg.role {
        MessageRole::User => {
            let has_attachments = msg
                .parts
                .iter()
                .any(|p| matches!(p, ContentPart::Attachment(_)));

            let content = if has_attachments {
                let parts = msg
                    .parts
                    .iter()
                    .map(|part| match part {
                        ContentPart::Text { text } => ChatCompletionRequestUserMessageContentPart::Text(
                            ChatCompletionRequestMessageContentPartText { text: text.clone() },
                        ),
                        ContentPart::Attachment(a) if a.media_type.starts_with("image/") => {
                            ChatCompletionRequestUserMessageContentPart::ImageUrl(
                                ChatCompletionRequestMessageContentPartImage {
                                    image_url: ImageUrl {
                                        url: a.url.clone(),
                                        detail: None,
                                    },
                                },
                            )
                        }
                        ContentPart::Attachment(a) => ChatCompletionRequestUserMessageContentPart::Text(
                            ChatCompletionRequestMessageContentPartText {
                                text: format!("[{}]({})", a.name, a.url),
                            },
                        ),
                    })
                    .collect();
                ChatCompletionRequestUserMessageContent::Array(parts)
            } else {
                ChatCompletionRequestUserMessageContent::Text(joined_text(&msg.parts))
            };

            ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                content,
                name: None,
            })
        }
        MessageRole::Assistant => {
            #[allow(deprecated)]
            ChatCompletionRequestMessage::Assistant(ChatCompletionRequestAssistantMessage {
                content: Some(ChatCompletionRequestAssistantMessageContent::Text(
                    joined_text(&msg.parts),
                )),
                refusal: None,
                name: None,
                audio: None,
                tool_calls: None,
                function_call: None,
            })
        }
    }
}

fn joined_text(parts: &[ContentPart]) -> String {
    parts
        .iter()
        .filter_map(|p| match p {
            ContentPart::Text { text } => Some(text.as_str()),
            ContentPart::Attachment(_) => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

impl GenerationProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.provider_name
    }

    fn stream(&self, request: GenerationRequest) -> GenerationStream {
        let oai_request = self.build_request(&request, true);

        // Clone the client for the 'static stream closure
        let client = self.client.clone();

        Box::pin(async_stream::try_stream! {
            let oai_stream = client
                .chat()
                .create_stream(oai_request)
                .await
                .map_err(map_openai_error)?;

            let mut inner = map_openai_stream(oai_stream);

            use futures_util::StreamExt;
            while let Some(event) = inner.next().await {
                yield event?;
            }
        })
    }

    async fn ping(&self) -> Result<(), GenerationError> {
        let request = GenerationRequest {
            model: String::new(),
            messages: vec![ContextMessage {
                role: MessageRole::User,
                parts: vec![ContentPart::Text {
                    text: "Hello".to_string(),
                }],
            }],
            system: None,
        };
        let mut oai_request = self.build_request(&request, false);
        oai_request.max_completion_tokens = Some(1);

        self.client
            .chat()
            .create(oai_request)
            .await
            .map_err(map_openai_error)?;
        Ok(())
    }
}

/// Map an `async_openai::error::OpenAIError` to a [`GenerationError`].
fn map_openai_error(err: async_openai::error::OpenAIError) -> GenerationError {
    use async_openai::error::OpenAIError;

    match &err {
        OpenAIError::ApiError(api_err) => {
            let code = api_err.code.as_deref().unwrap_or("");
            let error_type = api_err.r#type.as_deref().unwrap_or("");

            if code == "authentication_error"
                || error_type == "authentication_error"
                || code == "invalid_api_key"
                || api_err.message.contains("Incorrect API key")
                || api_err.message.contains("Invalid API key")
            {
                GenerationError::AuthenticationFailed
            } else if code == "rate_limit_exceeded" || error_type == "rate_limit_error" {
                GenerationError::RateLimited {
                    retry_after_ms: None,
                }
            } else if error_type == "invalid_request_error" {
                GenerationError::InvalidRequest(api_err.message.clone())
            } else {
                GenerationError::Provider {
                    message: err.to_string(),
                }
            }
        }
        OpenAIError::Reqwest(reqwest_err) => match reqwest_err.status().map(|s| s.as_u16()) {
            Some(401) => GenerationError::AuthenticationFailed,
            Some(429) => GenerationError::RateLimited {
                retry_after_ms: None,
            },
            _ => GenerationError::Provider {
                message: err.to_string(),
            },
        },
        OpenAIError::JSONDeserialize(_, content) => {
            GenerationError::Malformed(format!("failed to parse response: {content}"))
        }
        OpenAIError::StreamError(stream_err) => GenerationError::Stream(stream_err.to_string()),
        OpenAIError::InvalidArgument(msg) => GenerationError::InvalidRequest(msg.clone()),
        _ => GenerationError::Provider {
            message: err.to_string(),
        },
    }
}
