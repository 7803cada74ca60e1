//! String utility functions
//!
//! Helpers for identifier quoting and character-safe truncation.

/// String utility functions
#[derive(Debug)]
pub struct StringUtils;

impl StringUtils {
    /// Part of a qualified name after the last `.`
    pub fn unqualified(name: &str) -> &str {
        name.rsplit_once('.').map(|(_, bare)| bare).unwrap_or(name)
    }

    /// Cut a string to at most `max_chars` characters
    pub fn truncate_chars(s: &str, max_chars: usize) -> String {
        s.chars().take(max_chars).collect()
    }

    /// Shorten a string for log output, marking the cut with an ellipsis
    pub fn abbreviate(s: &str, max_chars: usize) -> String {
        if s.chars().count() <= max_chars {
            s.to_string()
        } else {
            let mut result = Self::truncate_chars(s, max_chars);
            result.push_str("...");
            result
        }
    }

    /// Quote an identifier with double quotes, doubling embedded quotes
    pub fn quote_identifier(name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}
