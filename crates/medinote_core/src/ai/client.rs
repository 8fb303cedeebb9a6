//! LLM collaborator contract and OpenAI-compatible HTTP adapter.
//!
//! # Responsibility
//! - Define the opaque `request(prompt, context?)` contract.
//! - Post chat-completion requests over blocking `reqwest`.
//!
//! # Invariants
//! - Every failure surfaces as `ServiceError`; nothing panics.
//! - A missing API key fails fast with `NotConfigured`; no canned reply.
//! - Prompt and reply text are never logged.

use crate::error::ServiceError;
use crate::settings::LlmSettings;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::time::Instant;

const ERROR_BODY_PREVIEW_CHARS: usize = 200;

/// One prompt with optional document context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmRequest {
    pub system: String,
    pub prompt: String,
    pub context: Option<String>,
}

/// Successful completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmReply {
    pub content: String,
    pub model: Option<String>,
}

/// Request/response collaborator behind the assistant.
pub trait LlmClient {
    fn request(&self, request: &LlmRequest) -> Result<LlmReply, ServiceError>;
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequestBody<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct ChatResponseBody {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Blocking HTTP client for OpenAI-compatible `/chat/completions`.
pub struct HttpLlmClient {
    settings: LlmSettings,
    http: reqwest::blocking::Client,
}

impl HttpLlmClient {
    pub fn new(settings: LlmSettings) -> Result<Self, ServiceError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(settings.timeout())
            .build()
            .map_err(|err| ServiceError::Transport(err.to_string()))?;
        Ok(Self { settings, http })
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.settings.endpoint.trim().trim_end_matches('/')
        )
    }
}

impl LlmClient for HttpLlmClient {
    fn request(&self, request: &LlmRequest) -> Result<LlmReply, ServiceError> {
        if !self.settings.has_api_key() {
            warn!("event=llm_request module=ai status=rejected reason=missing_api_key");
            return Err(ServiceError::NotConfigured("LLM API key"));
        }

        let user_content = compose_user_message(request);
        let body = ChatRequestBody {
            model: &self.settings.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &user_content,
                },
            ],
        };

        let started_at = Instant::now();
        let response = self
            .http
            .post(self.completions_url())
            .bearer_auth(self.settings.api_key.trim())
            .json(&body)
            .send()
            .map_err(|err| {
                warn!(
                    "event=llm_request module=ai status=error reason=transport timeout={}",
                    err.is_timeout()
                );
                ServiceError::Transport(err.to_string())
            })?;

        let status = response.status();
        let text = response
            .text()
            .map_err(|err| ServiceError::Transport(err.to_string()))?;
        info!(
            "event=llm_request module=ai status={} duration_ms={} response_bytes={}",
            status.as_u16(),
            started_at.elapsed().as_millis(),
            text.len()
        );

        if !status.is_success() {
            return Err(ServiceError::Status {
                code: status.as_u16(),
                message: error_message(&text),
            });
        }
        parse_completion(&text)
    }
}

fn compose_user_message(request: &LlmRequest) -> String {
    match request.context.as_deref().map(str::trim) {
        Some(context) if !context.is_empty() => {
            format!("{}\n\nContext:\n{}", request.prompt, context)
        }
        _ => request.prompt.clone(),
    }
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .map(|parsed| parsed.error.message)
        .unwrap_or_else(|_| body.trim().chars().take(ERROR_BODY_PREVIEW_CHARS).collect())
}

fn parse_completion(body: &str) -> Result<LlmReply, ServiceError> {
    let parsed: ChatResponseBody = serde_json::from_str(body)
        .map_err(|err| ServiceError::MalformedResponse(err.to_string()))?;
    let content = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
        .ok_or_else(|| ServiceError::MalformedResponse("no completion content".to_string()))?;
    Ok(LlmReply {
        content,
        model: parsed.model,
    })
}
