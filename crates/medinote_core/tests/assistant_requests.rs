use medinote_core::ai::{AiAction, AssistantService, LlmClient, LlmReply, LlmRequest};
use medinote_core::{Document, EditorError, ServiceError};
use std::cell::Cell;

/// Replies with a numbered answer so tests can tell calls apart.
struct Scripted {
    calls: Cell<u32>,
}

impl Scripted {
    fn new() -> Self {
        Self {
            calls: Cell::new(0),
        }
    }
}

impl LlmClient for Scripted {
    fn request(&self, _request: &LlmRequest) -> Result<LlmReply, ServiceError> {
        let call = self.calls.get() + 1;
        self.calls.set(call);
        Ok(LlmReply {
            content: format!("answer {call}"),
            model: Some("test".to_string()),
        })
    }
}

struct Down;

impl LlmClient for Down {
    fn request(&self, _request: &LlmRequest) -> Result<LlmReply, ServiceError> {
        Err(ServiceError::Status {
            code: 429,
            message: "quota exceeded".to_string(),
        })
    }
}

#[test]
fn out_of_order_completion_keeps_only_latest() {
    let mut assistant = AssistantService::new(Scripted::new(), 1_000);
    let older = assistant
        .begin(AiAction::Summarize, "note one", None)
        .unwrap();
    let newer = assistant
        .begin(AiAction::Summarize, "note two", None)
        .unwrap();

    let newer_result = assistant.execute(&newer);
    let older_result = assistant.execute(&older);

    let accepted = assistant.finish(&newer.ticket, newer_result).unwrap().unwrap();
    assert_eq!(accepted.text, "answer 1");
    assert!(assistant.finish(&older.ticket, older_result).is_none());
}

#[test]
fn cancelled_panel_drops_reply() {
    let mut assistant = AssistantService::new(Scripted::new(), 1_000);
    let prepared = assistant.begin(AiAction::Explain, "QT prolongation", None).unwrap();
    assert!(assistant.is_pending(AiAction::Explain));
    assistant.cancel(AiAction::Explain);

    let result = assistant.execute(&prepared);
    assert!(result.is_ok());
    assert!(assistant.finish(&prepared.ticket, result).is_none());
}

#[test]
fn service_failure_surfaces_as_notice() {
    let mut assistant = AssistantService::new(Down, 1_000);
    let err = assistant
        .ask(AiAction::Chat, "What is CHA2DS2-VASc?", None)
        .unwrap()
        .unwrap_err();
    assert!(matches!(err, EditorError::Service(ServiceError::Status { code: 429, .. })));
    assert!(err.notice().message.contains("quota exceeded"));
}

#[test]
fn accepted_reply_inserts_as_structured_content() {
    let mut assistant = AssistantService::new(Scripted::new(), 1_000);
    let reply = assistant
        .ask(AiAction::Summarize, "chest pain", Some("troponin negative"))
        .unwrap()
        .unwrap();

    let mut document = Document::deserialize("<p>HPI</p>");
    document.insert_content(&reply.html, true);
    assert_eq!(document.serialize(), "<p>HPI</p><br><br><p>answer 1</p>");
}
