//! Candidate backlog item extraction for sprint planning

use regex::Regex;
use std::sync::LazyLock;

/// Bullets, numbered lines, double-quoted spans, single-quoted spans
static ITEM_PATTERNS: LazyLock<[Regex; 4]> = LazyLock::new(|| {
    [
        r"[-*]\s*([^-*\n]+)",
        r"\d+\.\s*([^\n]+)",
        r#""([^"]+)""#,
        r"'([^']+)'",
    ]
    .map(|p| Regex::new(p).expect("backlog pattern is valid"))
});

/// Captures this short or shorter are noise
const MIN_ITEM_CHARS: usize = 5;

/// Extract candidate backlog items from free text.
///
/// Every pattern is scanned in turn and all matches are concatenated in scan
/// order. Overlapping matches are kept, so a quoted item on a bulleted line
/// shows up twice.
pub fn extract_items(text: &str) -> Vec<String> {
    ITEM_PATTERNS
        .iter()
        .flat_map(|re| re.captures_iter(text))
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .filter(|item| item.chars().count() > MIN_ITEM_CHARS)
        .map(str::to_string)
        .collect()
}
