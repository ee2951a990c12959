use regex::Regex;
use std::sync::LazyLock;

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Replaces every run of whitespace in `text` with `separator`.
pub fn collapse_whitespace(text: &str, separator: &str) -> String {
    WHITESPACE.replace_all(text, separator).into_owned()
}

pub fn trim_and_clean_text(text: &str) -> String {
    let cleaned = text
        .trim()
        .lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .collect::<Vec<&str>>()
        .join(" ");

    collapse_whitespace(&cleaned, " ")
}

pub fn extract_host_from_url(url: &str) -> Option<String> {
    url::Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(|host| host.to_string()))
}

/// First `max_chars` characters of `text`, never splitting a code point.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Whether `haystack` contains any of `needles`. Callers lowercase both sides.
pub fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_and_clean_text() {
        assert_eq!(trim_and_clean_text("  hello   world  "), "hello world");
        assert_eq!(
            trim_and_clean_text("line1\n  line2  \n\nline3"),
            "line1 line2 line3"
        );
        assert_eq!(trim_and_clean_text(""), "");
        assert_eq!(trim_and_clean_text("   \n  \n  "), "");
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("why  do\tyou\n apply", "_"), "why_do_you_apply");
        assert_eq!(collapse_whitespace("single", "_"), "single");
    }

    #[test]
    fn test_extract_host_from_url() {
        assert_eq!(
            extract_host_from_url("https://boards.greenhouse.io/acme/jobs/1"),
            Some("boards.greenhouse.io".to_string())
        );
        assert_eq!(extract_host_from_url("invalid-url"), None);
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello world", 5), "hello");
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("short", 100), "short");
    }

    #[test]
    fn test_contains_any() {
        assert!(contains_any("submit your resume", &["cv", "resume"]));
        assert!(!contains_any("newsletter signup", &["apply", "job"]));
        assert!(!contains_any("anything", &[]));
    }
}
