//! Plain-text rendering for the terminal console.
//!
//! Pure string builders over session messages and the monitor's view; the
//! console decides when to print them.

use std::fmt::Write as _;

use crate::icons::glyph_for;
use crate::monitor::MonitorView;
use crate::types::{LogEntry, LogKind, Message, Role, Suggestion};

const BAR_WIDTH: usize = 24;

// =============================================================================
// CONVERSATION
// =============================================================================

/// One message bubble followed by its numbered suggestion chips.
#[must_use]
pub fn message_block(msg: &Message) -> String {
    let speaker = match (msg.role, msg.is_error) {
        (Role::User, _) => "you",
        (Role::Assistant, false) => "cypher",
        (Role::Assistant, true) => "cypher (error)",
    };
    let mut out = format!("{speaker} > {}", msg.content);
    for chip in suggestion_chips(&msg.suggestions) {
        out.push('\n');
        out.push_str(&chip);
    }
    out
}

/// Numbered chip lines, 1-based to match `/pick <n>`.
#[must_use]
pub fn suggestion_chips(suggestions: &[Suggestion]) -> Vec<String> {
    suggestions
        .iter()
        .enumerate()
        .map(|(i, s)| match glyph_for(s.icon_hint.as_deref()) {
            Some(glyph) => format!("  [{}] {glyph} {}", i + 1, s.text),
            None => format!("  [{}] {}", i + 1, s.text),
        })
        .collect()
}

// =============================================================================
// PROGRESS
// =============================================================================

/// Fixed-width bar, e.g. `[#########---------------]  38%`.
#[must_use]
pub fn progress_bar(percent: u8) -> String {
    let percent = usize::from(percent.min(100));
    let filled = percent * BAR_WIDTH / 100;
    format!("[{}{}] {percent:>3}%", "#".repeat(filled), "-".repeat(BAR_WIDTH - filled))
}

/// Stage, counters, ETA, and the current item on one line.
#[must_use]
pub fn status_line(view: &MonitorView) -> String {
    let mut line = format!("{} {}", progress_bar(view.percent), view.stage_label);
    if view.total_items > 0 {
        let _ = write!(line, " | {}/{} items", view.completed_items, view.total_items);
    }
    if let Some(eta) = &view.eta {
        let _ = write!(line, " | {eta}");
    }
    if let Some(item) = &view.current_item {
        let _ = write!(line, " | {item}");
    }
    if let Some(err) = &view.error {
        let _ = write!(line, " | poll failed: {err}");
    }
    line
}

#[must_use]
pub fn log_line(entry: &LogEntry) -> String {
    let tag = match entry.kind {
        LogKind::Info => "info",
        LogKind::Insight => "insight",
        LogKind::Pattern => "pattern",
        LogKind::Success => "done",
        LogKind::Error => "error",
    };
    format!("[{tag:>7}] {}", entry.content)
}

/// Ranked insights, best first.
#[must_use]
pub fn top_insights(view: &MonitorView) -> Vec<String> {
    view.top_insights
        .iter()
        .enumerate()
        .map(|(i, insight)| format!("  {}. {} ({:.2})", i + 1, insight.content, insight.significance))
        .collect()
}

#[cfg(test)]
#[path = "render_test.rs"]
mod tests;
