//! Conversation session — ordered turns with a single outstanding request.
//!
//! DESIGN
//! ======
//! All state sits behind one mutex that is never held across an await. The
//! `is_processing` flag is the only serialisation: a send issued while it is
//! set is rejected, not queued, so assistant turns land in request order.
//!
//! ERROR HANDLING
//! ==============
//! Backend failures become error-flavoured assistant turns. Every accepted
//! exchange appends exactly one assistant turn; a dropped (cancelled) send
//! appends none but still clears `is_processing`.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{info, warn};

use crate::api::{ChatRequest, ConversationApi, HistoryTurn};
use crate::dispatch::RETRY_LAST;
use crate::error::CypherError;
use crate::types::{AssistantMode, Message, Params, Role, Suggestion, ViewContext};

const DIRECT_HINT: &str = "Type a command, like \"show open cases\" or \"Webb isn't a person\".";
const TUTORIAL_HINT: &str =
    "Ask me how anything works. I'll walk you through each screen and suggest what to try next.";

#[derive(Debug, Default)]
struct SessionState {
    messages: Vec<Message>,
    is_processing: bool,
    last_sent: Option<String>,
    mode: AssistantMode,
}

pub struct ConversationSession {
    api: Arc<dyn ConversationApi>,
    history_window: usize,
    state: Mutex<SessionState>,
}

/// Clears `is_processing` when the exchange finishes or its future is dropped.
struct ProcessingGuard<'a> {
    session: &'a ConversationSession,
}

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        self.session.lock().is_processing = false;
    }
}

impl ConversationSession {
    /// `history_window` caps how many prior turns accompany each request.
    pub fn new(api: Arc<dyn ConversationApi>, history_window: usize) -> Self {
        Self { api, history_window, state: Mutex::new(SessionState::default()) }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // =========================================================================
    // OPERATIONS
    // =========================================================================

    /// Append a user turn, ask the backend, append its reply.
    ///
    /// `view` is read at call time so the command is interpreted against the
    /// screen the user is on now.
    ///
    /// # Errors
    ///
    /// [`CypherError::InvalidInput`] for blank text and [`CypherError::Busy`]
    /// while another exchange is outstanding. Neither changes any state.
    pub async fn send_message(&self, text: &str, view: &ViewContext) -> Result<(), CypherError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(CypherError::InvalidInput);
        }

        let request = {
            let mut state = self.lock();
            if state.is_processing {
                return Err(CypherError::Busy);
            }
            let history = self.history_before(&state.messages, state.messages.len());
            state.messages.push(Message::user(text));
            state.last_sent = Some(text.to_string());
            state.is_processing = true;
            ChatRequest { message: text.to_string(), context: view.clone(), mode: state.mode, history }
        };

        info!(view = %view.view, mode = request.mode.as_str(), "session: message sent");
        self.exchange(request).await;
        Ok(())
    }

    /// Resend the most recent user message without adding a new user turn.
    ///
    /// # Errors
    ///
    /// [`CypherError::NothingToRetry`] when nothing has been sent since the
    /// last clear, [`CypherError::Busy`] while an exchange is outstanding.
    pub async fn retry_last(&self, view: &ViewContext) -> Result<(), CypherError> {
        let request = {
            let mut state = self.lock();
            if state.is_processing {
                return Err(CypherError::Busy);
            }
            let Some(text) = state.last_sent.clone() else {
                return Err(CypherError::NothingToRetry);
            };
            let original = state
                .messages
                .iter()
                .rposition(|m| m.role == Role::User)
                .unwrap_or(state.messages.len());
            let history = self.history_before(&state.messages, original);
            state.is_processing = true;
            ChatRequest { message: text, context: view.clone(), mode: state.mode, history }
        };

        info!(view = %view.view, "session: retrying last message");
        self.exchange(request).await;
        Ok(())
    }

    /// Empty the history. Mode and any in-flight request are untouched.
    pub fn clear_history(&self) {
        let mut state = self.lock();
        state.messages.clear();
        state.last_sent = None;
    }

    /// Flip between direct and tutorial phrasing; returns the new mode.
    pub fn toggle_assistant_mode(&self) -> AssistantMode {
        let mut state = self.lock();
        state.mode = state.mode.toggled();
        state.mode
    }

    /// Append an assistant-shaped notice outside of a user exchange, e.g. the
    /// outcome of a suggestion's action.
    pub fn push_notice(&self, content: impl Into<String>, is_error: bool) {
        let msg = if is_error {
            Message::assistant_error(content, Vec::new())
        } else {
            Message::assistant(content, Vec::new())
        };
        self.lock().messages.push(msg);
    }

    // =========================================================================
    // READERS
    // =========================================================================

    #[must_use]
    pub fn messages(&self) -> Vec<Message> {
        self.lock().messages.clone()
    }

    #[must_use]
    pub fn is_processing(&self) -> bool {
        self.lock().is_processing
    }

    #[must_use]
    pub fn mode(&self) -> AssistantMode {
        self.lock().mode
    }

    #[must_use]
    pub fn last_sent(&self) -> Option<String> {
        self.lock().last_sent.clone()
    }

    /// Suggestions attached to the newest assistant turn.
    #[must_use]
    pub fn latest_suggestions(&self) -> Vec<Suggestion> {
        self.lock()
            .messages
            .iter()
            .rev()
            .find(|m| m.role == Role::Assistant)
            .map(|m| m.suggestions.clone())
            .unwrap_or_default()
    }

    /// Placeholder text shown while the history is empty.
    #[must_use]
    pub fn empty_state_hint(&self) -> &'static str {
        match self.mode() {
            AssistantMode::Direct => DIRECT_HINT,
            AssistantMode::Tutorial => TUTORIAL_HINT,
        }
    }

    // =========================================================================
    // INTERNALS
    // =========================================================================

    fn history_before(&self, messages: &[Message], end: usize) -> Vec<HistoryTurn> {
        let end = end.min(messages.len());
        let start = end.saturating_sub(self.history_window);
        messages[start..end].iter().map(HistoryTurn::from).collect()
    }

    async fn exchange(&self, request: ChatRequest) {
        let _guard = ProcessingGuard { session: self };

        let reply = match self.api.send(&request).await {
            Ok(reply) => Message::assistant(reply.message, reply.suggestions),
            Err(e) => {
                warn!(error = %e, "session: exchange failed");
                let err = CypherError::RemoteCallFailure(e);
                Message::assistant_error(failure_text(&err), vec![retry_suggestion()])
            }
        };
        self.lock().messages.push(reply);
    }
}

fn failure_text(err: &CypherError) -> String {
    format!("Sorry, that didn't go through ({err}). You can try again.")
}

fn retry_suggestion() -> Suggestion {
    Suggestion::new("Try again")
        .with_action(RETRY_LAST, Params::new())
        .with_icon("retry")
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
