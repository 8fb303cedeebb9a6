//! Assistant use-case service.
//!
//! # Responsibility
//! - Run persona actions against an `LlmClient`.
//! - Drop replies that were superseded or cancelled.
//!
//! # Invariants
//! - At most one current request per action; replies for any other
//!   ticket are discarded, never surfaced.
//! - A cancelled action does not abort the call in flight.

use crate::ai::client::{LlmClient, LlmReply, LlmRequest};
use crate::ai::persona::{self, AiAction};
use crate::ai::tracker::{RequestTicket, RequestTracker};
use crate::error::{EditorResult, ServiceError, ValidationError};
use crate::speech::SpeechSegment;
use log::{debug, warn};

/// A request that has been issued a ticket but not yet sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedRequest {
    pub ticket: RequestTicket,
    pub request: LlmRequest,
}

/// Accepted assistant reply, shaped for the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistantReply {
    pub action: AiAction,
    /// Raw reply text.
    pub text: String,
    /// Markup ready for `insert_content(.., true)`.
    pub html: String,
    /// Speaker segments; only filled for `AiAction::Podcast`.
    pub segments: Vec<SpeechSegment>,
}

pub struct AssistantService<C: LlmClient> {
    client: C,
    tracker: RequestTracker,
    max_context_chars: usize,
}

impl<C: LlmClient> AssistantService<C> {
    pub fn new(client: C, max_context_chars: usize) -> Self {
        Self {
            client,
            tracker: RequestTracker::new(),
            max_context_chars,
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Issues a ticket for `action` and builds its prompt.
    ///
    /// # Errors
    /// - `MissingField("prompt")` when neither input nor context has text.
    pub fn begin(
        &mut self,
        action: AiAction,
        input: &str,
        context: Option<&str>,
    ) -> EditorResult<PreparedRequest> {
        let has_context = context.is_some_and(|context| !context.trim().is_empty());
        if input.trim().is_empty() && !has_context {
            return Err(ValidationError::MissingField("prompt").into());
        }
        let request = persona::build_request(action, input, context, self.max_context_chars);
        let ticket = self.tracker.issue(action);
        debug!(
            "event=ai_request module=ai status=issued action={} sequence={}",
            action.as_str(),
            ticket.sequence()
        );
        Ok(PreparedRequest { ticket, request })
    }

    /// Sends a prepared request; does not touch tracker state.
    pub fn execute(&self, prepared: &PreparedRequest) -> Result<LlmReply, ServiceError> {
        self.client.request(&prepared.request)
    }

    /// Delivers a finished call. Returns `None` for stale or cancelled tickets.
    pub fn finish(
        &mut self,
        ticket: &RequestTicket,
        result: Result<LlmReply, ServiceError>,
    ) -> Option<EditorResult<AssistantReply>> {
        let action = ticket.action();
        if !self.tracker.accept(ticket) {
            debug!(
                "event=ai_response module=ai status=discarded action={} sequence={}",
                action.as_str(),
                ticket.sequence()
            );
            return None;
        }

        Some(match result {
            Ok(reply) => {
                let segments = match action {
                    AiAction::Podcast => persona::parse_podcast_script(&reply.content),
                    _ => Vec::new(),
                };
                Ok(AssistantReply {
                    action,
                    html: persona::reply_to_html(&reply.content),
                    text: reply.content,
                    segments,
                })
            }
            Err(err) => {
                warn!(
                    "event=ai_response module=ai status=error action={} error={}",
                    action.as_str(),
                    err
                );
                Err(err.into())
            }
        })
    }

    /// Runs `action` synchronously: begin, execute, finish.
    pub fn ask(
        &mut self,
        action: AiAction,
        input: &str,
        context: Option<&str>,
    ) -> Option<EditorResult<AssistantReply>> {
        let prepared = match self.begin(action, input, context) {
            Ok(prepared) => prepared,
            Err(err) => return Some(Err(err)),
        };
        let result = self.execute(&prepared);
        self.finish(&prepared.ticket, result)
    }

    pub fn is_pending(&self, action: AiAction) -> bool {
        self.tracker.is_pending(action)
    }

    /// Closes the panel for `action`; its in-flight reply will be dropped.
    pub fn cancel(&mut self, action: AiAction) {
        self.tracker.cancel(action);
    }
}
