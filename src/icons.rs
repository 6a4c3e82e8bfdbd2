//! Suggestion icon hints.
//!
//! The backend names icons symbolically. Only names in [`IconHint`] render;
//! anything else renders without an icon.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IconHint {
    Check,
    Cross,
    Navigate,
    Retry,
    Merge,
    Insight,
    Pattern,
    Warning,
    Search,
    Document,
    Play,
}

impl IconHint {
    /// Resolve a backend icon name. Unknown names are `None`, never an error.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        let hint = match name.trim().to_ascii_lowercase().as_str() {
            "check" | "confirm" | "check-circle" => Self::Check,
            "x" | "cross" | "reject" | "x-circle" => Self::Cross,
            "navigate" | "arrow" | "arrow-right" | "external-link" => Self::Navigate,
            "retry" | "refresh" | "rotate-ccw" => Self::Retry,
            "merge" | "git-merge" => Self::Merge,
            "insight" | "lightbulb" | "sparkles" => Self::Insight,
            "pattern" | "network" | "share-2" => Self::Pattern,
            "warning" | "alert" | "alert-triangle" => Self::Warning,
            "search" => Self::Search,
            "file" | "document" | "file-text" => Self::Document,
            "play" | "run" | "zap" => Self::Play,
            _ => return None,
        };
        Some(hint)
    }

    /// Glyph registered for the terminal renderer.
    #[must_use]
    pub fn glyph(self) -> &'static str {
        match self {
            Self::Check => "✓",
            Self::Cross => "✗",
            Self::Navigate => "→",
            Self::Retry => "↻",
            Self::Merge => "⇄",
            Self::Insight => "✦",
            Self::Pattern => "◈",
            Self::Warning => "⚠",
            Self::Search => "⌕",
            Self::Document => "▤",
            Self::Play => "▶",
        }
    }
}

/// Glyph for an optional icon name, or `None` when it does not resolve.
#[must_use]
pub fn glyph_for(name: Option<&str>) -> Option<&'static str> {
    name.and_then(IconHint::parse).map(IconHint::glyph)
}

#[cfg(test)]
#[path = "icons_test.rs"]
mod tests;
