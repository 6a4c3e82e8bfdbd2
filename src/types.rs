//! Shared data model for conversation turns, suggestions, and job progress.
//!
//! SYSTEM CONTEXT
//! ==============
//! Messages and suggestions belong to the conversation session; progress
//! snapshots arrive from the polled backend and are folded into log entries
//! by the monitor. The wire shapes here are the JSON the backend speaks.

use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Free-form action parameters, as sent by the backend with a suggestion.
pub type Params = serde_json::Map<String, serde_json::Value>;

/// Current time as milliseconds since Unix epoch.
#[must_use]
pub fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}

// =============================================================================
// CONVERSATION
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One turn in the conversation. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    /// Milliseconds since Unix epoch.
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<Suggestion>,
    /// Assistant turn that reports a failure rather than a reply.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl Message {
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role: Role::User,
            content: content.into(),
            timestamp: now_ms(),
            suggestions: Vec::new(),
            is_error: false,
        }
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>, suggestions: Vec<Suggestion>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role: Role::Assistant,
            content: content.into(),
            timestamp: now_ms(),
            suggestions,
            is_error: false,
        }
    }

    /// Assistant-shaped turn carrying an error notice.
    #[must_use]
    pub fn assistant_error(content: impl Into<String>, suggestions: Vec<Suggestion>) -> Self {
        Self { is_error: true, ..Self::assistant(content, suggestions) }
    }
}

/// A clickable affordance attached to an assistant turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Params::is_empty")]
    pub params: Params,
    #[serde(default, rename = "icon", skip_serializing_if = "Option::is_none")]
    pub icon_hint: Option<String>,
}

impl Suggestion {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), action: None, params: Params::new(), icon_hint: None }
    }

    #[must_use]
    pub fn with_action(mut self, action: impl Into<String>, params: Params) -> Self {
        self.action = Some(action.into());
        self.params = params;
        self
    }

    #[must_use]
    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon_hint = Some(icon.into());
        self
    }
}

/// Phrasing mode for the command surface. Has no effect on dispatch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssistantMode {
    #[default]
    Direct,
    Tutorial,
}

impl AssistantMode {
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::Direct => Self::Tutorial,
            Self::Tutorial => Self::Direct,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Tutorial => "tutorial",
        }
    }
}

// =============================================================================
// VIEWS
// =============================================================================

/// Screens the command surface can navigate to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    #[default]
    Dashboard,
    Cases,
    Case,
    Entities,
    Insights,
    Patterns,
    Upload,
    Settings,
}

impl View {
    pub const ALL: [View; 8] = [
        View::Dashboard,
        View::Cases,
        View::Case,
        View::Entities,
        View::Insights,
        View::Patterns,
        View::Upload,
        View::Settings,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dashboard => "dashboard",
            Self::Cases => "cases",
            Self::Case => "case",
            Self::Entities => "entities",
            Self::Insights => "insights",
            Self::Patterns => "patterns",
            Self::Upload => "upload",
            Self::Settings => "settings",
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for View {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        View::ALL
            .into_iter()
            .find(|v| v.as_str() == wanted)
            .ok_or_else(|| format!("unknown view: {s}"))
    }
}

/// The screen the user is looking at when a command is issued.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewContext {
    pub view: View,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_id: Option<String>,
}

impl ViewContext {
    #[must_use]
    pub fn new(view: View) -> Self {
        Self { view, sub_path: None, case_id: None }
    }

    /// Switch screens. Opening a single case also makes it the active case;
    /// other views keep whatever case was active.
    pub fn navigate(&mut self, view: View, sub_path: Option<String>) {
        if view == View::Case && sub_path.is_some() {
            self.case_id.clone_from(&sub_path);
        }
        self.view = view;
        self.sub_path = sub_path;
    }
}

// =============================================================================
// JOB PROGRESS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Complete,
    Failed,
}

impl JobStatus {
    /// `complete` and `failed` end monitoring for a job.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }

    /// Forward-only ordering used to reject status regressions.
    #[must_use]
    pub(crate) fn rank(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Running => 1,
            Self::Complete | Self::Failed => 2,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Complete => "complete",
            Self::Failed => "failed",
        }
    }
}

/// Coarse phase of a case analysis job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    #[default]
    Idle,
    Tier0,
    Extraction,
    Synthesis,
    Critique,
}

impl Stage {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Tier0 => "Initial Scan",
            Self::Extraction => "Extracting Entities",
            Self::Synthesis => "Synthesizing Insights",
            Self::Critique => "Validating Findings",
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Tier0 => "tier0",
            Self::Extraction => "extraction",
            Self::Synthesis => "synthesis",
            Self::Critique => "critique",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedInsight {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub significance: f64,
}

/// One polled observation of a job. Never stored beyond a single update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobProgressSnapshot {
    pub status: JobStatus,
    #[serde(default)]
    pub stage: Stage,
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub current_item: Option<String>,
    #[serde(default)]
    pub completed_items: u64,
    #[serde(default)]
    pub total_items: u64,
    #[serde(default)]
    pub recent_insight: Option<String>,
    #[serde(default)]
    pub top_insights: Vec<RankedInsight>,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl JobProgressSnapshot {
    /// An empty snapshot with the given status, for building test fixtures.
    #[must_use]
    pub fn with_status(status: JobStatus) -> Self {
        Self {
            status,
            stage: Stage::Idle,
            progress: 0.0,
            current_item: None,
            completed_items: 0,
            total_items: 0,
            recent_insight: None,
            top_insights: Vec::new(),
            error_message: None,
        }
    }

    /// Completed count clamped to the total once the total is known.
    #[must_use]
    pub fn clamped_completed(&self) -> u64 {
        if self.total_items > 0 {
            self.completed_items.min(self.total_items)
        } else {
            self.completed_items
        }
    }
}

// =============================================================================
// LOG STREAM
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    Info,
    Insight,
    Pattern,
    Success,
    Error,
}

/// One line of the monitor's log pane. `id` is derived from content so a
/// re-observed discovery maps to the same entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: String,
    pub kind: LogKind,
    pub content: String,
    pub timestamp: i64,
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
