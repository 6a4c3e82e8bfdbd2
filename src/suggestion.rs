//! Suggestion activation — what happens when a chip is picked.
//!
//! DESIGN
//! ======
//! `retry_last` goes straight to the session's retry path and never reaches
//! the dispatcher. A chip with no action sends its label as a user message.
//! Everything else is dispatched; mutation outcomes land in the conversation
//! as assistant notices, while navigation and forms are handed back to the
//! caller because they change the screen rather than the history.

use tracing::info;

use crate::dispatch::{ActionId, Dispatcher, Outcome, RETRY_LAST};
use crate::error::CypherError;
use crate::session::ConversationSession;
use crate::types::{Params, Suggestion, View, ViewContext};

/// What activating a suggestion did, for the caller to act on.
#[derive(Debug, Clone, PartialEq)]
pub enum Activation {
    /// The label went out as a user message.
    Sent,
    /// The last user message was resent.
    Retried,
    /// The active view changed; `ViewContext` has already been updated.
    Navigated { view: View, sub_path: Option<String> },
    /// The caller should present this form.
    FormOpened { form: String, params: Params },
    /// The backend accepted a mutation; a notice was appended.
    Mutated(ActionId),
    /// The action could not be performed; an error notice was appended.
    Failed,
}

/// Activate `suggestion` against the current view.
///
/// # Errors
///
/// Only session-level rejections propagate ([`CypherError::Busy`],
/// [`CypherError::InvalidInput`], [`CypherError::NothingToRetry`]). Action
/// failures are reported in the conversation instead.
pub async fn activate(
    session: &ConversationSession,
    dispatcher: &Dispatcher,
    suggestion: &Suggestion,
    view: &mut ViewContext,
) -> Result<Activation, CypherError> {
    let Some(action) = suggestion.action.as_deref().map(str::trim) else {
        session.send_message(&suggestion.text, view).await?;
        return Ok(Activation::Sent);
    };

    if action == RETRY_LAST {
        session.retry_last(view).await?;
        return Ok(Activation::Retried);
    }

    match dispatcher.dispatch(action, &suggestion.params).await {
        Ok(Outcome::Navigated { view: target, sub_path }) => {
            info!(view = %target, "suggestion: navigated");
            view.navigate(target, sub_path.clone());
            Ok(Activation::Navigated { view: target, sub_path })
        }
        Ok(Outcome::FormOpened { form, params }) => Ok(Activation::FormOpened { form, params }),
        Ok(Outcome::RetryRequested) => {
            session.retry_last(view).await?;
            Ok(Activation::Retried)
        }
        Ok(Outcome::Mutated { action, .. }) => {
            session.push_notice(action.done_message(), false);
            Ok(Activation::Mutated(action))
        }
        Err(e) => {
            session.push_notice(failure_notice(&suggestion.text, &e), true);
            Ok(Activation::Failed)
        }
    }
}

fn failure_notice(label: &str, err: &CypherError) -> String {
    match err {
        CypherError::UnresolvedAction(_) => format!("I don't know how to do \"{label}\" yet ({err})."),
        _ => format!("Couldn't complete \"{label}\": {err}"),
    }
}

#[cfg(test)]
#[path = "suggestion_test.rs"]
mod tests;
