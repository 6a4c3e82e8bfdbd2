//! Derived view-state for one monitored job.
//!
//! DESIGN
//! ======
//! A pure reducer over a sequence of snapshots. The poll task owns the
//! timing; everything here takes `now` explicitly so it can be driven
//! deterministically.
//!
//! - Log entries carry content-derived ids. A discovery is logged the first
//!   time its id is seen; repeats across polls are dropped.
//! - The log keeps the newest [`LOG_CAP`] entries in arrival order.
//! - Status only moves forward; once terminal, later snapshots are ignored.
//! - The ETA is recomputed only when `completed_items` changes.

use std::collections::{HashSet, VecDeque};

use sha2::{Digest, Sha256};
use tokio::time::Instant;

use crate::types::{JobProgressSnapshot, JobStatus, LogEntry, LogKind, RankedInsight, Stage};

/// Maximum number of log entries retained per job.
pub const LOG_CAP: usize = 200;

/// Number of ranked insights exposed to the view.
pub const TOP_INSIGHT_COUNT: usize = 3;

const FAILED_FALLBACK: &str = "Processing failed";

// =============================================================================
// OUTPUT CONTRACT
// =============================================================================

/// Final outcome of a job once `complete` or `failed` is observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalSummary {
    pub status: JobStatus,
    pub message: String,
    pub completed_items: u64,
    pub total_items: u64,
    pub elapsed_secs: Option<u64>,
}

/// Everything the presentation shell needs to draw the progress view.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonitorView {
    pub job_id: String,
    pub stage: Stage,
    pub stage_label: &'static str,
    pub status: Option<JobStatus>,
    pub percent: u8,
    pub current_item: Option<String>,
    pub completed_items: u64,
    pub total_items: u64,
    pub log: Vec<LogEntry>,
    pub top_insights: Vec<RankedInsight>,
    /// e.g. `"~3m 20s remaining"`.
    pub eta: Option<String>,
    /// Last poll failure, cleared by the next successful poll.
    pub error: Option<String>,
    pub terminal: Option<TerminalSummary>,
}

// =============================================================================
// STATE
// =============================================================================

#[derive(Debug)]
pub struct MonitorState {
    job_id: String,
    status: Option<JobStatus>,
    stage: Stage,
    progress: f64,
    current_item: Option<String>,
    completed_items: u64,
    total_items: u64,
    top_insights: Vec<RankedInsight>,
    log: VecDeque<LogEntry>,
    seen: HashSet<String>,
    started_at: Option<Instant>,
    last_completed: Option<u64>,
    eta_secs: Option<u64>,
    poll_error: Option<String>,
    terminal: Option<TerminalSummary>,
}

impl MonitorState {
    #[must_use]
    pub fn new(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            status: None,
            stage: Stage::Idle,
            progress: 0.0,
            current_item: None,
            completed_items: 0,
            total_items: 0,
            top_insights: Vec::new(),
            log: VecDeque::with_capacity(LOG_CAP),
            seen: HashSet::new(),
            started_at: None,
            last_completed: None,
            eta_secs: None,
            poll_error: None,
            terminal: None,
        }
    }

    #[must_use]
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.terminal.is_some()
    }

    #[must_use]
    pub fn eta_secs(&self) -> Option<u64> {
        self.eta_secs
    }

    #[must_use]
    pub fn log_len(&self) -> usize {
        self.log.len()
    }

    /// Fold one snapshot into the state. Returns `true` once the job is
    /// terminal, meaning polling should stop.
    pub fn apply_snapshot_at(&mut self, snap: &JobProgressSnapshot, now: Instant, now_ms: i64) -> bool {
        if self.terminal.is_some() {
            return true;
        }
        self.poll_error = None;

        let status = match self.status {
            Some(current) if snap.status.rank() < current.rank() => current,
            _ => snap.status,
        };
        self.status = Some(status);
        if status == JobStatus::Running && self.started_at.is_none() {
            self.started_at = Some(now);
        }

        if snap.stage != self.stage {
            self.stage = snap.stage;
            if snap.stage != Stage::Idle {
                let content = format!("Stage: {}", snap.stage.label());
                let id = format!("stage-{}", snap.stage.as_str());
                self.push_once(id, LogKind::Info, content, now_ms);
            }
        }

        self.progress = if snap.progress.is_finite() { snap.progress.clamp(0.0, 1.0) } else { 0.0 };
        self.current_item = snap.current_item.clone();
        self.total_items = snap.total_items;
        self.completed_items = snap.clamped_completed();

        if let Some(text) = snap.recent_insight.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            let kind = if self.stage == Stage::Synthesis { LogKind::Pattern } else { LogKind::Insight };
            self.push_once(content_id("insight", text), kind, text.to_string(), now_ms);
        }

        if !snap.top_insights.is_empty() {
            self.top_insights.clone_from(&snap.top_insights);
        }

        self.update_eta(now);
        if self.stage == Stage::Idle {
            self.eta_secs = None;
        }

        match status {
            JobStatus::Complete => {
                let message = if self.total_items > 0 {
                    format!("Analysis complete: {} of {} items processed", self.completed_items, self.total_items)
                } else {
                    "Analysis complete".to_string()
                };
                self.finish(JobStatus::Complete, LogKind::Success, message, now, now_ms);
                true
            }
            JobStatus::Failed => {
                let message = snap
                    .error_message
                    .as_deref()
                    .map(str::trim)
                    .filter(|m| !m.is_empty())
                    .unwrap_or(FAILED_FALLBACK)
                    .to_string();
                self.finish(JobStatus::Failed, LogKind::Error, message, now, now_ms);
                true
            }
            JobStatus::Pending | JobStatus::Running => false,
        }
    }

    /// Record a failed poll. State is otherwise untouched so the next good
    /// snapshot picks up where this one left off.
    pub fn record_poll_error(&mut self, message: impl Into<String>) {
        self.poll_error = Some(message.into());
    }

    #[must_use]
    pub fn view(&self) -> MonitorView {
        MonitorView {
            job_id: self.job_id.clone(),
            stage: self.stage,
            stage_label: self.stage.label(),
            status: self.status,
            percent: percent(self.progress),
            current_item: self.current_item.clone(),
            completed_items: self.completed_items,
            total_items: self.total_items,
            log: self.log.iter().cloned().collect(),
            top_insights: self.top_insights.iter().take(TOP_INSIGHT_COUNT).cloned().collect(),
            eta: self.eta_secs.map(|secs| format!("~{} remaining", format_eta(secs))),
            error: self.poll_error.clone(),
            terminal: self.terminal.clone(),
        }
    }

    // =========================================================================
    // INTERNALS
    // =========================================================================

    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn update_eta(&mut self, now: Instant) {
        let completed = self.completed_items;
        if completed == 0 || self.last_completed == Some(completed) {
            return;
        }
        let previous = self.last_completed.replace(completed);
        // A regressed counter never produces a new estimate.
        if previous.is_some_and(|p| completed < p) {
            return;
        }
        let Some(started_at) = self.started_at else {
            return;
        };

        let elapsed_ms = now.saturating_duration_since(started_at).as_millis() as f64;
        let avg_per_item = elapsed_ms / completed as f64;
        let remaining = self.total_items.saturating_sub(completed) as f64;
        self.eta_secs = Some((avg_per_item * remaining / 1000.0).ceil() as u64);
    }

    fn finish(&mut self, status: JobStatus, kind: LogKind, message: String, now: Instant, now_ms: i64) {
        self.eta_secs = None;
        self.push_once(status.as_str().to_string(), kind, message.clone(), now_ms);
        self.terminal = Some(TerminalSummary {
            status,
            message,
            completed_items: self.completed_items,
            total_items: self.total_items,
            elapsed_secs: self
                .started_at
                .map(|t| now.saturating_duration_since(t).as_secs()),
        });
    }

    fn push_once(&mut self, id: String, kind: LogKind, content: String, now_ms: i64) {
        if !self.seen.insert(id.clone()) {
            return;
        }
        self.push_log(LogEntry { id, kind, content, timestamp: now_ms });
    }

    pub(crate) fn push_log(&mut self, entry: LogEntry) {
        while self.log.len() >= LOG_CAP {
            self.log.pop_front();
        }
        self.log.push_back(entry);
    }
}

// =============================================================================
// HELPERS
// =============================================================================

/// Deterministic entry id: prefix plus the first 8 bytes of SHA-256(text).
#[must_use]
pub fn content_id(prefix: &str, text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    let hex: String = digest.iter().take(8).map(|b| format!("{b:02x}")).collect();
    format!("{prefix}-{hex}")
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn percent(progress: f64) -> u8 {
    (progress * 100.0).round().clamp(0.0, 100.0) as u8
}

/// Compact duration: `45s`, `3m 20s`, `1h 05m`.
#[must_use]
pub fn format_eta(secs: u64) -> String {
    match secs {
        0..60 => format!("{secs}s"),
        60..3600 => format!("{}m {:02}s", secs / 60, secs % 60),
        _ => format!("{}h {:02}m", secs / 3600, (secs % 3600) / 60),
    }
}

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
