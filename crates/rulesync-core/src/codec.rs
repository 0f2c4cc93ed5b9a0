//! Flattened-string codec
//!
//! The downstream consumer reads a single string of `key: value` entries
//! joined by four newlines:
//!
//! ```text
//! greeting: hello
//!
//!
//!
//! tone: keep answers short
//! ```
//!
//! Values may contain newlines, but never the separator itself.

use crate::rule::Rule;
use indexmap::IndexMap;

/// Entry separator: exactly four newline characters
pub const SEPARATOR: &str = "\n\n\n\n";

/// One `key: value` entry of the flattened string
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Entry {
    /// Entry key
    pub key: String,
    /// Entry value, possibly empty
    pub value: String,
}

impl Entry {
    /// Create an entry
    #[inline]
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Result of parsing a flattened string
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Parsed {
    /// Entries in input order, duplicates included
    pub entries: Vec<Entry>,
    /// Key to value; the last occurrence of a duplicated key wins
    pub values: IndexMap<String, String>,
    /// Keys of segments that had no `key:` prefix and were read as bare keys
    pub degenerate: Vec<String>,
}

impl Parsed {
    /// Value currently associated with a key
    #[inline]
    #[must_use]
    pub fn value_of(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Whether no entry was found
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys in input order, duplicates included
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.key.as_str())
    }

    /// Entries for `rules` in rule order, looking values up by key
    ///
    /// A rule without a known value gets an empty value.
    #[must_use]
    pub fn entries_for(&self, rules: &[Rule]) -> Vec<Entry> {
        rules
            .iter()
            .map(|rule| {
                let value = self.value_of(&rule.key).unwrap_or_default();
                Entry::new(rule.key.clone(), value)
            })
            .collect()
    }
}

/// Parse a flattened string
///
/// Blank input yields an empty result. Each non-blank segment is split at its
/// first colon: the trimmed prefix is the key and the suffix, with leading
/// whitespace removed, is the value. A segment without a usable colon becomes
/// a bare key with an empty value. Segments whose key trims to nothing are
/// dropped.
#[must_use]
pub fn parse(text: &str) -> Parsed {
    let mut parsed = Parsed::default();
    if text.trim().is_empty() {
        return parsed;
    }

    for segment in text.split(SEPARATOR) {
        if segment.trim().is_empty() {
            continue;
        }

        let (key, value) = match segment.find(':') {
            Some(idx) if idx > 0 => (segment[..idx].trim(), segment[idx + 1..].trim_start()),
            _ => {
                let key = segment.trim();
                tracing::debug!(key, "flattened entry without a key prefix");
                parsed.degenerate.push(key.to_string());
                (key, "")
            }
        };

        if key.is_empty() {
            continue;
        }

        parsed.values.insert(key.to_string(), value.to_string());
        parsed.entries.push(Entry::new(key, value));
    }

    parsed
}

/// Build a flattened string from entries
///
/// Every entry is written as `key: value`, including empty values.
#[must_use]
pub fn build(entries: &[Entry]) -> String {
    entries
        .iter()
        .map(|e| format!("{}: {}", e.key, e.value))
        .collect::<Vec<_>>()
        .join(SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn joined(parts: &[&str]) -> String {
        parts.join(SEPARATOR)
    }

    #[test]
    fn parse_empty_and_blank() {
        assert!(parse("").is_empty());
        assert!(parse("  \n\t ").is_empty());
        assert!(parse(&joined(&["", " ", ""])).is_empty());
    }

    #[test]
    fn parse_single_entry() {
        let parsed = parse("foo: bar");
        assert_eq!(parsed.entries, vec![Entry::new("foo", "bar")]);
        assert_eq!(parsed.value_of("foo"), Some("bar"));
    }

    #[test]
    fn parse_keeps_internal_and_trailing_whitespace() {
        let parsed = parse("  notes :   line one\nline two  ");
        assert_eq!(parsed.entries, vec![Entry::new("notes", "line one\nline two  ")]);
    }

    #[test]
    fn parse_splits_on_first_colon_only() {
        let parsed = parse("url: https://example.com:8080");
        assert_eq!(parsed.value_of("url"), Some("https://example.com:8080"));
    }

    #[test]
    fn parse_colonless_segment_is_bare_key() {
        let parsed = parse(&joined(&["a: 1", "just a key"]));
        assert_eq!(parsed.entries[1], Entry::new("just a key", ""));
        assert_eq!(parsed.degenerate, vec!["just a key".to_string()]);
    }

    #[test]
    fn parse_leading_colon_is_bare_key() {
        let parsed = parse(": orphan");
        assert_eq!(parsed.entries, vec![Entry::new(": orphan", "")]);
    }

    #[test]
    fn parse_drops_empty_keys() {
        let parsed = parse(&joined(&["   : value", "k: v"]));
        assert_eq!(parsed.entries, vec![Entry::new("k", "v")]);
    }

    #[test]
    fn parse_duplicate_keys_last_wins_in_map() {
        let parsed = parse(&joined(&["x: 1", "y: 2", "x: 3"]));
        assert_eq!(parsed.entries.len(), 3);
        assert_eq!(parsed.value_of("x"), Some("3"));
        assert_eq!(parsed.keys().collect::<Vec<_>>(), vec!["x", "y", "x"]);
    }

    #[test]
    fn parse_value_may_contain_short_newline_runs() {
        let parsed = parse("k: a\n\n\nb");
        assert_eq!(parsed.value_of("k"), Some("a\n\n\nb"));
    }

    #[test]
    fn build_empty() {
        assert_eq!(build(&[]), "");
    }

    #[test]
    fn build_joins_with_separator() {
        let text = build(&[Entry::new("a", "1"), Entry::new("b", "")]);
        assert_eq!(text, "a: 1\n\n\n\nb: ");
    }

    #[test]
    fn build_parse_round_trip() {
        let text = joined(&["greeting: hello", "tone: short\nand precise", "empty: "]);
        assert_eq!(build(&parse(&text).entries), text);
    }

    #[test]
    fn entries_for_rules_defaults_missing_values() {
        let parsed = parse("a: 1");
        let rules = vec![Rule::new(1, "b"), Rule::new(2, "a")];
        assert_eq!(
            parsed.entries_for(&rules),
            vec![Entry::new("b", ""), Entry::new("a", "1")]
        );
    }
}
