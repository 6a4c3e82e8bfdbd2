//! Backend collaborators — conversation, progress polling, and mutations.
//!
//! DESIGN
//! ======
//! The core only sees the three async traits below. `HttpBackend` implements
//! all of them over JSON/HTTP; tests substitute hand-written mocks. Nothing in
//! here keeps state between calls.

pub mod config;
pub mod http;

use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::types::{AssistantMode, JobProgressSnapshot, Message, Params, Role, Suggestion, ViewContext};

pub use config::ApiConfig;
pub use http::HttpBackend;

// =============================================================================
// CONVERSATION
// =============================================================================

/// Role/content pair forwarded as prior conversation context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryTurn {
    pub role: Role,
    pub content: String,
}

impl From<&Message> for HistoryTurn {
    fn from(msg: &Message) -> Self {
        Self { role: msg.role, content: msg.content.clone() }
    }
}

/// One conversational exchange as sent to the backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub message: String,
    pub context: ViewContext,
    pub mode: AssistantMode,
    pub history: Vec<HistoryTurn>,
}

/// A successful reply. "I don't understand" is still a reply; transport and
/// backend failures are `Err(ApiError)` instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub message: String,
    #[serde(default)]
    pub suggestions: Vec<Suggestion>,
}

#[async_trait::async_trait]
pub trait ConversationApi: Send + Sync {
    /// Interpret a user message against the current view.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] when the exchange cannot be completed.
    async fn send(&self, request: &ChatRequest) -> Result<ChatReply, ApiError>;
}

// =============================================================================
// PROGRESS
// =============================================================================

#[async_trait::async_trait]
pub trait ProgressApi: Send + Sync {
    /// Fetch the current status snapshot of a job.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] on transport failure or an undecodable body.
    async fn get_progress(&self, job_id: &str) -> Result<JobProgressSnapshot, ApiError>;
}

// =============================================================================
// MUTATIONS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Post,
    Patch,
}

/// A single backend call that changes a remote resource.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationRequest {
    pub method: HttpMethod,
    /// Path relative to the API base URL, starting with `/`.
    pub path: String,
    pub body: Params,
}

#[async_trait::async_trait]
pub trait ActionApi: Send + Sync {
    /// Perform the mutation. Only success/failure matters to the caller; the
    /// decoded body is passed through for logging.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] when the backend rejects or never answers.
    async fn execute(&self, request: &MutationRequest) -> Result<serde_json::Value, ApiError>;
}
