//! Action dispatcher — maps an action identifier + params to an effect.
//!
//! DESIGN
//! ======
//! Resolution is a pure function from `(action, params)` to [`Effect`];
//! performing an effect is the only step that touches the backend. The
//! dispatcher holds no state of its own, so one instance can serve any number
//! of concurrent callers.
//!
//! `retry_last` is recognised before generic resolution and never reaches
//! the mutation path. Unknown identifiers resolve to
//! [`CypherError::UnresolvedAction`] and leave the dispatcher usable.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::api::{ActionApi, HttpMethod, MutationRequest};
use crate::error::CypherError;
use crate::types::{Params, View};

/// Reserved identifier that resends the last user message.
pub const RETRY_LAST: &str = "retry_last";

// =============================================================================
// ACTIONS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionId {
    Navigate,
    RetryLast,
    OpenForm,
    ConfirmEntity,
    RejectEntity,
    UpdateEntity,
    MergeEntities,
    DismissInsight,
    ProcessCase,
    RunSynthesis,
}

impl ActionId {
    pub const ALL: [ActionId; 10] = [
        ActionId::Navigate,
        ActionId::RetryLast,
        ActionId::OpenForm,
        ActionId::ConfirmEntity,
        ActionId::RejectEntity,
        ActionId::UpdateEntity,
        ActionId::MergeEntities,
        ActionId::DismissInsight,
        ActionId::ProcessCase,
        ActionId::RunSynthesis,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Navigate => "navigate",
            Self::RetryLast => RETRY_LAST,
            Self::OpenForm => "open_form",
            Self::ConfirmEntity => "confirm_entity",
            Self::RejectEntity => "reject_entity",
            Self::UpdateEntity => "update_entity",
            Self::MergeEntities => "merge_entities",
            Self::DismissInsight => "dismiss_insight",
            Self::ProcessCase => "process_case",
            Self::RunSynthesis => "run_synthesis",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL.into_iter().find(|a| a.as_str() == raw)
    }

    /// Assistant text appended after the backend accepts the mutation.
    #[must_use]
    pub fn done_message(self) -> &'static str {
        match self {
            Self::ConfirmEntity => "Entity confirmed.",
            Self::RejectEntity => "Entity rejected.",
            Self::UpdateEntity => "Entity updated.",
            Self::MergeEntities => "Entities merged.",
            Self::DismissInsight => "Insight dismissed.",
            Self::ProcessCase => "Case processing started.",
            Self::RunSynthesis => "Synthesis started.",
            Self::Navigate | Self::RetryLast | Self::OpenForm => "Done.",
        }
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// EFFECTS
// =============================================================================

/// What an action resolves to, before anything is performed.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Navigate { view: View, sub_path: Option<String> },
    OpenForm { form: String, params: Params },
    RetryLast,
    Mutate { action: ActionId, request: MutationRequest },
}

/// Result of performing an [`Effect`].
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The caller should switch the active view.
    Navigated { view: View, sub_path: Option<String> },
    /// The caller should present the named form.
    FormOpened { form: String, params: Params },
    /// The caller should resend the last user message.
    RetryRequested,
    /// The backend accepted the mutation.
    Mutated { action: ActionId, response: Value },
}

// =============================================================================
// DISPATCHER
// =============================================================================

pub struct Dispatcher {
    api: Arc<dyn ActionApi>,
}

impl Dispatcher {
    pub fn new(api: Arc<dyn ActionApi>) -> Self {
        Self { api }
    }

    /// Resolve an action identifier and its params to an effect.
    ///
    /// # Errors
    ///
    /// [`CypherError::UnresolvedAction`] for unknown identifiers,
    /// [`CypherError::InvalidParams`] when required params are missing.
    pub fn resolve(action: &str, params: &Params) -> Result<Effect, CypherError> {
        if action.trim() == RETRY_LAST {
            return Ok(Effect::RetryLast);
        }

        let Some(id) = ActionId::parse(action) else {
            return Err(CypherError::UnresolvedAction(action.to_string()));
        };

        let effect = match id {
            ActionId::RetryLast => Effect::RetryLast,
            ActionId::Navigate => resolve_navigate(params)?,
            ActionId::OpenForm => Effect::OpenForm {
                form: required_str(params, "form", id)?,
                params: params.clone(),
            },
            ActionId::ConfirmEntity => {
                let entity_id = required_segment(params, "entity_id", id)?;
                mutate(id, HttpMethod::Post, format!("/entities/{entity_id}/confirm"), Params::new())
            }
            ActionId::RejectEntity => {
                let entity_id = required_segment(params, "entity_id", id)?;
                mutate(id, HttpMethod::Post, format!("/entities/{entity_id}/reject"), without(params, &["entity_id"]))
            }
            ActionId::UpdateEntity => {
                let entity_id = required_segment(params, "entity_id", id)?;
                let body = without(params, &["entity_id"]);
                if body.is_empty() {
                    return Err(invalid(id, "no fields to update"));
                }
                mutate(id, HttpMethod::Patch, format!("/entities/{entity_id}"), body)
            }
            ActionId::MergeEntities => {
                let source_id = required_str(params, "source_id", id)?;
                let target_id = required_str(params, "target_id", id)?;
                if source_id == target_id {
                    return Err(invalid(id, "cannot merge an entity into itself"));
                }
                let mut body = Params::new();
                body.insert("source_id".into(), Value::String(source_id));
                body.insert("target_id".into(), Value::String(target_id));
                mutate(id, HttpMethod::Post, "/entities/merge".to_string(), body)
            }
            ActionId::DismissInsight => {
                let insight_id = required_segment(params, "insight_id", id)?;
                mutate(id, HttpMethod::Post, format!("/insights/{insight_id}/dismiss"), Params::new())
            }
            ActionId::ProcessCase => {
                let case_id = required_segment(params, "case_id", id)?;
                mutate(id, HttpMethod::Post, format!("/cases/{case_id}/process"), Params::new())
            }
            ActionId::RunSynthesis => {
                let case_id = required_segment(params, "case_id", id)?;
                mutate(id, HttpMethod::Post, format!("/cases/{case_id}/synthesize"), Params::new())
            }
        };
        debug!(action = %id, "dispatch: resolved");
        Ok(effect)
    }

    /// Perform a resolved effect. Only mutations call the backend.
    ///
    /// # Errors
    ///
    /// [`CypherError::RemoteCallFailure`] when the mutation fails.
    pub async fn perform(&self, effect: Effect) -> Result<Outcome, CypherError> {
        match effect {
            Effect::Navigate { view, sub_path } => Ok(Outcome::Navigated { view, sub_path }),
            Effect::OpenForm { form, params } => Ok(Outcome::FormOpened { form, params }),
            Effect::RetryLast => Ok(Outcome::RetryRequested),
            Effect::Mutate { action, request } => {
                info!(%action, path = %request.path, "dispatch: executing mutation");
                match self.api.execute(&request).await {
                    Ok(response) => Ok(Outcome::Mutated { action, response }),
                    Err(e) => {
                        warn!(%action, error = %e, "dispatch: mutation failed");
                        Err(CypherError::RemoteCallFailure(e))
                    }
                }
            }
        }
    }

    /// Resolve then perform.
    ///
    /// # Errors
    ///
    /// See [`Dispatcher::resolve`] and [`Dispatcher::perform`].
    pub async fn dispatch(&self, action: &str, params: &Params) -> Result<Outcome, CypherError> {
        let effect = Self::resolve(action, params).inspect_err(|e| {
            warn!(action, error = %e, "dispatch: unresolved");
        })?;
        self.perform(effect).await
    }
}

// =============================================================================
// PARAM HELPERS
// =============================================================================

fn resolve_navigate(params: &Params) -> Result<Effect, CypherError> {
    let raw = required_str(params, "view", ActionId::Navigate)?;
    // "entities/e-12" carries its sub-path inline.
    let (view_part, inline_sub) = match raw.split_once('/') {
        Some((view, rest)) => (view, Some(rest.trim_matches('/').to_string())),
        None => (raw.as_str(), None),
    };
    let view = view_part
        .parse::<View>()
        .map_err(|reason| invalid(ActionId::Navigate, &reason))?;
    let sub_path = optional_str(params, "sub_path")
        .or(inline_sub)
        .filter(|s| !s.is_empty());
    Ok(Effect::Navigate { view, sub_path })
}

fn mutate(action: ActionId, method: HttpMethod, path: String, body: Params) -> Effect {
    Effect::Mutate { action, request: MutationRequest { method, path, body } }
}

fn invalid(action: ActionId, reason: &str) -> CypherError {
    CypherError::InvalidParams { action: action.as_str().to_string(), reason: reason.to_string() }
}

/// String or number param, trimmed and non-empty.
fn optional_str(params: &Params, key: &str) -> Option<String> {
    match params.get(key)? {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn required_str(params: &Params, key: &str, action: ActionId) -> Result<String, CypherError> {
    optional_str(params, key).ok_or_else(|| invalid(action, &format!("missing `{key}`")))
}

/// A param that is interpolated into a URL path segment.
fn required_segment(params: &Params, key: &str, action: ActionId) -> Result<String, CypherError> {
    let value = required_str(params, key, action)?;
    if value.contains(['/', '?', '#']) {
        return Err(invalid(action, &format!("`{key}` is not a valid identifier")));
    }
    Ok(value)
}

fn without(params: &Params, keys: &[&str]) -> Params {
    params
        .iter()
        .filter(|(k, _)| !keys.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

#[cfg(test)]
#[path = "dispatch_test.rs"]
mod tests;
