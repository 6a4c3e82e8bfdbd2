use super::*;
use crate::types::{RankedInsight, Stage};

#[test]
fn assistant_block_lists_numbered_chips_with_glyphs() {
    let msg = Message::assistant(
        "Webb looks like a company.",
        vec![
            Suggestion::new("Confirm").with_icon("check"),
            Suggestion::new("Something else").with_icon("no-such-icon"),
        ],
    );
    let block = message_block(&msg);
    let lines: Vec<&str> = block.lines().collect();
    assert_eq!(lines[0], "cypher > Webb looks like a company.");
    assert_eq!(lines[1], "  [1] ✓ Confirm");
    assert_eq!(lines[2], "  [2] Something else");
}

#[test]
fn error_turn_is_labelled() {
    let msg = Message::assistant_error("Sorry", Vec::new());
    assert!(message_block(&msg).starts_with("cypher (error) > "));
    assert!(message_block(&Message::user("hi")).starts_with("you > "));
}

#[test]
fn progress_bar_fills_proportionally() {
    assert_eq!(progress_bar(0), format!("[{}]   0%", "-".repeat(24)));
    assert_eq!(progress_bar(50), format!("[{}{}]  50%", "#".repeat(12), "-".repeat(12)));
    assert_eq!(progress_bar(200), format!("[{}] 100%", "#".repeat(24)));
}

#[test]
fn status_line_includes_counts_eta_and_item() {
    let view = MonitorView {
        stage: Stage::Extraction,
        stage_label: Stage::Extraction.label(),
        percent: 40,
        completed_items: 4,
        total_items: 10,
        eta: Some("~1m 30s remaining".into()),
        current_item: Some("bank_statement_03.pdf".into()),
        ..MonitorView::default()
    };
    let line = status_line(&view);
    assert!(line.contains("Extracting Entities"));
    assert!(line.contains("4/10 items"));
    assert!(line.contains("~1m 30s remaining"));
    assert!(line.ends_with("bank_statement_03.pdf"));
}

#[test]
fn status_line_shows_poll_error() {
    let view = MonitorView { error: Some("timeout".into()), ..MonitorView::default() };
    assert!(status_line(&view).contains("poll failed: timeout"));
}

#[test]
fn log_line_tags_kind() {
    let entry = LogEntry { id: "x".into(), kind: LogKind::Pattern, content: "Shared address".into(), timestamp: 0 };
    assert_eq!(log_line(&entry), "[pattern] Shared address");
}

#[test]
fn top_insights_are_numbered() {
    let view = MonitorView {
        top_insights: vec![RankedInsight { id: "i-1".into(), content: "Circular payments".into(), significance: 0.9 }],
        ..MonitorView::default()
    };
    assert_eq!(top_insights(&view), vec!["  1. Circular payments (0.90)".to_string()]);
}
