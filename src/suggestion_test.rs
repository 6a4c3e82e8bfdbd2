use super::*;
use crate::api::{ActionApi, ChatReply, ChatRequest, ConversationApi, MutationRequest};
use crate::error::ApiError;
use crate::types::Role;
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};

// =========================================================================
// Mocks
// =========================================================================

#[derive(Default)]
struct EchoChat {
    requests: Mutex<Vec<ChatRequest>>,
}

#[async_trait::async_trait]
impl ConversationApi for EchoChat {
    async fn send(&self, request: &ChatRequest) -> Result<ChatReply, ApiError> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(ChatReply { message: format!("ack: {}", request.message), suggestions: Vec::new() })
    }
}

#[derive(Default)]
struct RecordingActions {
    calls: Mutex<Vec<MutationRequest>>,
    fail: bool,
}

#[async_trait::async_trait]
impl ActionApi for RecordingActions {
    async fn execute(&self, request: &MutationRequest) -> Result<Value, ApiError> {
        self.calls.lock().unwrap().push(request.clone());
        if self.fail {
            Err(ApiError::Status { status: 500, body: String::new() })
        } else {
            Ok(Value::Null)
        }
    }
}

struct Harness {
    chat: Arc<EchoChat>,
    actions: Arc<RecordingActions>,
    session: ConversationSession,
    dispatcher: Dispatcher,
}

fn harness(fail: bool) -> Harness {
    let chat = Arc::new(EchoChat::default());
    let actions = Arc::new(RecordingActions { fail, ..RecordingActions::default() });
    Harness {
        session: ConversationSession::new(chat.clone(), 20),
        dispatcher: Dispatcher::new(actions.clone()),
        chat,
        actions,
    }
}

fn params(value: Value) -> Params {
    value.as_object().cloned().unwrap_or_default()
}

// =========================================================================
// activate
// =========================================================================

#[tokio::test]
async fn label_only_chip_sends_its_text() {
    let h = harness(false);
    let mut view = ViewContext::new(View::Dashboard);

    let result = activate(&h.session, &h.dispatcher, &Suggestion::new("Show open cases"), &mut view).await;

    assert_eq!(result.unwrap(), Activation::Sent);
    assert_eq!(h.chat.requests.lock().unwrap()[0].message, "Show open cases");
    assert!(h.actions.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn retry_chip_resends_without_dispatching() {
    let h = harness(false);
    let mut view = ViewContext::new(View::Entities);
    h.session.send_message("Webb isn't a person", &view).await.unwrap();

    let chip = Suggestion::new("Try again").with_action(RETRY_LAST, Params::new());
    let result = activate(&h.session, &h.dispatcher, &chip, &mut view).await;

    assert_eq!(result.unwrap(), Activation::Retried);
    let requests = h.chat.requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].message, "Webb isn't a person");
    assert!(h.actions.calls.lock().unwrap().is_empty());
    let users = h.session.messages().iter().filter(|m| m.role == Role::User).count();
    assert_eq!(users, 1);
}

#[tokio::test]
async fn navigate_chip_updates_view_and_appends_nothing() {
    let h = harness(false);
    let mut view = ViewContext::new(View::Dashboard);
    let chip = Suggestion::new("Open case").with_action("navigate", params(json!({ "view": "case", "sub_path": "c-3" })));

    let result = activate(&h.session, &h.dispatcher, &chip, &mut view).await.unwrap();

    assert_eq!(result, Activation::Navigated { view: View::Case, sub_path: Some("c-3".into()) });
    assert_eq!(view.view, View::Case);
    assert_eq!(view.case_id.as_deref(), Some("c-3"));
    assert!(h.session.messages().is_empty());
}

#[tokio::test]
async fn open_form_chip_is_returned_to_caller() {
    let h = harness(false);
    let mut view = ViewContext::new(View::Cases);
    let chip = Suggestion::new("New case").with_action("open_form", params(json!({ "form": "new_case" })));

    let result = activate(&h.session, &h.dispatcher, &chip, &mut view).await.unwrap();

    assert!(matches!(result, Activation::FormOpened { ref form, .. } if form == "new_case"));
    assert!(h.session.messages().is_empty());
}

#[tokio::test]
async fn mutation_success_appends_completion_notice() {
    let h = harness(false);
    let mut view = ViewContext::new(View::Entities);
    let chip = Suggestion::new("Confirm Webb").with_action("confirm_entity", params(json!({ "entity_id": "e-12" })));

    let result = activate(&h.session, &h.dispatcher, &chip, &mut view).await.unwrap();

    assert_eq!(result, Activation::Mutated(ActionId::ConfirmEntity));
    assert_eq!(h.actions.calls.lock().unwrap()[0].path, "/entities/e-12/confirm");
    let messages = h.session.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].content, "Entity confirmed.");
    assert!(!messages[0].is_error);
}

#[tokio::test]
async fn mutation_failure_appends_error_notice() {
    let h = harness(true);
    let mut view = ViewContext::new(View::Insights);
    let chip = Suggestion::new("Dismiss").with_action("dismiss_insight", params(json!({ "insight_id": "i-4" })));

    let result = activate(&h.session, &h.dispatcher, &chip, &mut view).await.unwrap();

    assert_eq!(result, Activation::Failed);
    let messages = h.session.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].is_error);
    assert!(messages[0].content.contains("Dismiss"));
}

#[tokio::test]
async fn unknown_action_is_an_inert_notice() {
    let h = harness(false);
    let mut view = ViewContext::new(View::Dashboard);
    let chip = Suggestion::new("Frobnicate").with_action("frobnicate", Params::new());

    let result = activate(&h.session, &h.dispatcher, &chip, &mut view).await.unwrap();

    assert_eq!(result, Activation::Failed);
    assert!(h.actions.calls.lock().unwrap().is_empty());
    assert!(h.chat.requests.lock().unwrap().is_empty());
    assert!(h.session.messages()[0].is_error);
    assert_eq!(view, ViewContext::new(View::Dashboard));
}
