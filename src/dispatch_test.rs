use super::*;
use crate::error::ApiError;
use serde_json::json;
use std::sync::Mutex;

// =========================================================================
// MockActions
// =========================================================================

#[derive(Default)]
struct MockActions {
    calls: Mutex<Vec<MutationRequest>>,
    fail_with: Option<u16>,
}

#[async_trait::async_trait]
impl ActionApi for MockActions {
    async fn execute(&self, request: &MutationRequest) -> Result<Value, ApiError> {
        self.calls.lock().unwrap().push(request.clone());
        match self.fail_with {
            Some(status) => Err(ApiError::Status { status, body: "nope".into() }),
            None => Ok(json!({ "ok": true })),
        }
    }
}

fn params(value: Value) -> Params {
    value.as_object().cloned().unwrap_or_default()
}

// =========================================================================
// resolve — navigation and forms
// =========================================================================

#[test]
fn navigate_resolves_view_and_sub_path() {
    let effect = Dispatcher::resolve("navigate", &params(json!({ "view": "entities", "sub_path": "e-12" }))).unwrap();
    assert_eq!(effect, Effect::Navigate { view: View::Entities, sub_path: Some("e-12".into()) });
}

#[test]
fn navigate_accepts_inline_sub_path() {
    let effect = Dispatcher::resolve("navigate", &params(json!({ "view": "case/c-3/" }))).unwrap();
    assert_eq!(effect, Effect::Navigate { view: View::Case, sub_path: Some("c-3".into()) });
}

#[test]
fn navigate_unknown_view_is_invalid_params() {
    let err = Dispatcher::resolve("navigate", &params(json!({ "view": "timeline" }))).unwrap_err();
    assert!(matches!(err, CypherError::InvalidParams { ref action, .. } if action == "navigate"));
}

#[test]
fn open_form_requires_form_name() {
    assert!(Dispatcher::resolve("open_form", &Params::new()).is_err());
    let effect = Dispatcher::resolve("open_form", &params(json!({ "form": "new_case" }))).unwrap();
    assert!(matches!(effect, Effect::OpenForm { ref form, .. } if form == "new_case"));
}

// =========================================================================
// resolve — retry and unknown
// =========================================================================

#[test]
fn retry_last_is_intercepted() {
    assert_eq!(Dispatcher::resolve("retry_last", &Params::new()).unwrap(), Effect::RetryLast);
    // Params are irrelevant to retry.
    assert_eq!(
        Dispatcher::resolve(" retry_last ", &params(json!({ "entity_id": "x" }))).unwrap(),
        Effect::RetryLast
    );
}

#[test]
fn unknown_action_is_unresolved() {
    let err = Dispatcher::resolve("launch_rockets", &Params::new()).unwrap_err();
    assert!(matches!(err, CypherError::UnresolvedAction(ref a) if a == "launch_rockets"));
}

// =========================================================================
// resolve — mutations
// =========================================================================

#[test]
fn confirm_entity_builds_post() {
    let effect = Dispatcher::resolve("confirm_entity", &params(json!({ "entity_id": "e-1" }))).unwrap();
    let Effect::Mutate { action, request } = effect else {
        panic!("expected mutation");
    };
    assert_eq!(action, ActionId::ConfirmEntity);
    assert_eq!(request.method, HttpMethod::Post);
    assert_eq!(request.path, "/entities/e-1/confirm");
    assert!(request.body.is_empty());
}

#[test]
fn update_entity_sends_remaining_params_as_patch_body() {
    let effect = Dispatcher::resolve(
        "update_entity",
        &params(json!({ "entity_id": "webb", "entity_type": "organization" })),
    )
    .unwrap();
    let Effect::Mutate { request, .. } = effect else {
        panic!("expected mutation");
    };
    assert_eq!(request.method, HttpMethod::Patch);
    assert_eq!(request.path, "/entities/webb");
    assert_eq!(Value::Object(request.body), json!({ "entity_type": "organization" }));
}

#[test]
fn update_entity_without_fields_is_invalid() {
    let err = Dispatcher::resolve("update_entity", &params(json!({ "entity_id": "webb" }))).unwrap_err();
    assert!(matches!(err, CypherError::InvalidParams { .. }));
}

#[test]
fn numeric_ids_are_accepted() {
    let effect = Dispatcher::resolve("process_case", &params(json!({ "case_id": 42 }))).unwrap();
    assert!(matches!(effect, Effect::Mutate { ref request, .. } if request.path == "/cases/42/process"));
}

#[test]
fn path_segments_reject_slashes() {
    let err = Dispatcher::resolve("dismiss_insight", &params(json!({ "insight_id": "../admin" }))).unwrap_err();
    assert!(matches!(err, CypherError::InvalidParams { .. }));
}

#[test]
fn merge_rejects_self_merge() {
    let err =
        Dispatcher::resolve("merge_entities", &params(json!({ "source_id": "a", "target_id": "a" }))).unwrap_err();
    assert!(err.to_string().contains("itself"));
}

// =========================================================================
// dispatch
// =========================================================================

#[tokio::test]
async fn dispatch_mutation_calls_backend_once() {
    let api = Arc::new(MockActions::default());
    let dispatcher = Dispatcher::new(api.clone());
    let outcome = dispatcher
        .dispatch("run_synthesis", &params(json!({ "case_id": "c-7" })))
        .await
        .unwrap();
    assert!(matches!(outcome, Outcome::Mutated { action: ActionId::RunSynthesis, .. }));
    let calls = api.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].path, "/cases/c-7/synthesize");
}

#[tokio::test]
async fn dispatch_retry_never_reaches_backend() {
    let api = Arc::new(MockActions::default());
    let dispatcher = Dispatcher::new(api.clone());
    let outcome = dispatcher.dispatch(RETRY_LAST, &Params::new()).await.unwrap();
    assert_eq!(outcome, Outcome::RetryRequested);
    assert!(api.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn dispatch_navigation_never_reaches_backend() {
    let api = Arc::new(MockActions::default());
    let dispatcher = Dispatcher::new(api.clone());
    let outcome = dispatcher
        .dispatch("navigate", &params(json!({ "view": "patterns" })))
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::Navigated { view: View::Patterns, sub_path: None });
    assert!(api.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn dispatch_failure_is_remote_call_failure() {
    let api = Arc::new(MockActions { fail_with: Some(500), ..MockActions::default() });
    let dispatcher = Dispatcher::new(api);
    let err = dispatcher
        .dispatch("confirm_entity", &params(json!({ "entity_id": "e-1" })))
        .await
        .unwrap_err();
    assert!(matches!(err, CypherError::RemoteCallFailure(ApiError::Status { status: 500, .. })));
}

#[tokio::test]
async fn dispatcher_stays_usable_after_unknown_action() {
    let api = Arc::new(MockActions::default());
    let dispatcher = Dispatcher::new(api.clone());
    assert!(dispatcher.dispatch("frobnicate", &Params::new()).await.is_err());
    assert!(
        dispatcher
            .dispatch("confirm_entity", &params(json!({ "entity_id": "e-2" })))
            .await
            .is_ok()
    );
    assert_eq!(api.calls.lock().unwrap().len(), 1);
}
