//! Participant name extraction
//!
//! Keywords match case-insensitively, but a captured name must be a single
//! title-case word (`Jordan`, not `jordan` or `JORDAN`).

use regex::Regex;
use std::sync::LazyLock;

/// Self-introduction patterns, tried in order
static INTRODUCTION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\b(?i:i am|i'm|this is|my name is) ([A-Z][a-z]+)",
        r"^(?i:hi|hello|hey),? (?i:i'm|i am|this is) ([A-Z][a-z]+)",
        r"^([A-Z][a-z]+) (?i:here)\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("introduction pattern is valid"))
    .collect()
});

static GREETING_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?i:hi|hello|hey),? ([A-Z][a-z]+)\b").expect("greeting pattern is valid")
});

/// Words that follow a greeting but are not names
const GREETING_STOPLIST: &[&str] = &["there", "team", "everyone", "folks", "all"];

/// Typographic apostrophes as straight ones, so "I’m" reads as "I'm"
pub(crate) fn straighten_apostrophes(text: &str) -> String {
    text.replace('\u{2019}', "'")
}

/// Whether an utterance reads like a self-introduction.
///
/// Deliberately loose: any "i am" / "i'm" / "this is" / "my name is" anywhere,
/// or a leading hi/hello/hey.
pub fn is_introduction(text: &str) -> bool {
    let lower = straighten_apostrophes(text.trim_start()).to_lowercase();
    ["i am", "i'm", "this is", "my name is"]
        .iter()
        .any(|k| lower.contains(k))
        || ["hi", "hello", "hey"].iter().any(|g| lower.starts_with(g))
}

/// Pull a name out of a human self-introduction
pub fn extract_from_introduction(text: &str) -> Option<String> {
    let text = straighten_apostrophes(text.trim());
    INTRODUCTION_PATTERNS
        .iter()
        .find_map(|re| re.captures(&text))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Pull a name out of an assistant greeting such as "Hi Sam, thanks for joining"
pub fn extract_from_greeting(text: &str) -> Option<String> {
    let name = GREETING_PATTERN.captures(text)?.get(1)?.as_str();
    if GREETING_STOPLIST
        .iter()
        .any(|stop| stop.eq_ignore_ascii_case(name))
    {
        return None;
    }
    Some(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_introduction_patterns() {
        assert_eq!(extract_from_introduction("I'm Jordan"), Some("Jordan".into()));
        assert_eq!(extract_from_introduction("Hi, I'm Sam"), Some("Sam".into()));
        assert_eq!(extract_from_introduction("hello this is Priya, ready to go"), Some("Priya".into()));
        assert_eq!(extract_from_introduction("MY NAME IS Lee"), Some("Lee".into()));
        assert_eq!(extract_from_introduction("Morgan here"), Some("Morgan".into()));
    }

    #[test]
    fn test_typographic_apostrophe() {
        assert!(is_introduction("I\u{2019}m Jordan"));
        assert_eq!(extract_from_introduction("I\u{2019}m Jordan"), Some("Jordan".into()));
        assert_eq!(extract_from_introduction("Hey, I\u{2019}m Sam"), Some("Sam".into()));
    }

    #[test]
    fn test_introduction_requires_title_case_name() {
        assert_eq!(extract_from_introduction("i'm jordan"), None);
        assert_eq!(extract_from_introduction("I am going to pair with Dana"), None);
        assert_eq!(extract_from_introduction("Yesterday I shipped the login page"), None);
    }

    #[test]
    fn test_greeting_extraction() {
        assert_eq!(extract_from_greeting("Hi Sam, thanks for kicking us off!"), Some("Sam".into()));
        assert_eq!(extract_from_greeting("Great, hello Taylor. What did you work on?"), Some("Taylor".into()));
    }

    #[test]
    fn test_greeting_stoplist() {
        assert_eq!(extract_from_greeting("Hi team"), None);
        assert_eq!(extract_from_greeting("Hi Team, let's begin"), None);
        assert_eq!(extract_from_greeting("Hey Everyone!"), None);
        assert_eq!(extract_from_greeting("Hello there"), None);
        assert_eq!(extract_from_greeting("No greeting in here"), None);
    }

    #[test]
    fn test_is_introduction() {
        assert!(is_introduction("Hi, I'm Sam"));
        assert!(is_introduction("hey all"));
        assert!(is_introduction("This is Dana"));
        assert!(!is_introduction("Yesterday I shipped the login page"));
        assert!(!is_introduction("That's all"));
    }
}
