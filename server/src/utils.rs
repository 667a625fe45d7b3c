use std::sync::LazyLock;

use regex::Regex;

static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

static EMAIL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());

/// Cleans a user-supplied name: control characters dropped, whitespace runs
/// collapsed, ends trimmed. Case is preserved.
pub fn sanitize_name(input: &str) -> String {
    let visible: String = input.chars().filter(|c| !c.is_control()).collect();

    WHITESPACE_RUN
        .replace_all(&visible, " ")
        .trim()
        .to_string()
}

pub fn valid_email(input: &str) -> bool {
    EMAIL.is_match(input)
}

/// Emails are matched case-insensitively everywhere, so store them folded.
pub fn normalize_email(input: &str) -> String {
    input.trim().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_whitespace() {
        assert_eq!(sanitize_name("  Finance   Committee  "), "Finance Committee");
        assert_eq!(sanitize_name("a\t\tb"), "a b");
    }

    #[test]
    fn strips_control_characters() {
        assert_eq!(sanitize_name("Ada\u{0000} Lovelace\u{0007}"), "Ada Lovelace");
        assert_eq!(sanitize_name("line\nbreak"), "line break");
    }

    #[test]
    fn preserves_case_and_punctuation() {
        assert_eq!(sanitize_name("O'Brien-Smith Jr."), "O'Brien-Smith Jr.");
    }

    #[test]
    fn empty_after_cleaning() {
        assert_eq!(sanitize_name("   "), "");
        assert_eq!(sanitize_name("\u{0001}\u{0002}"), "");
    }

    #[test]
    fn accepts_plausible_emails() {
        assert!(valid_email("ada@example.com"));
        assert!(valid_email("a.b+tag@sub.domain.org"));
    }

    #[test]
    fn rejects_implausible_emails() {
        assert!(!valid_email("ada"));
        assert!(!valid_email("ada@"));
        assert!(!valid_email("@example.com"));
        assert!(!valid_email("ada@example"));
        assert!(!valid_email("ada @example.com"));
    }

    #[test]
    fn normalizes_email_case() {
        assert_eq!(normalize_email("  Ada@Example.COM "), "ada@example.com");
    }
}
