//! Author-name parsing and the "Lastname, F." identity key.
//!
//! Names arrive as "Last, Given", "Last, Given, Suffix" or "Given Last".
//! Two raw names with the same last name and the same first given initial
//! share a [`NameKey`] and are collated as one person. This merges distinct
//! people who share a surname and initial; that approximation is intended.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Parsed attributes of a free-form author name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedName {
    pub last_name: String,
    pub given_names: String,
    /// First given name with periods removed; `None` when there are no given names.
    pub first_name: Option<String>,
    /// True when the first given name is a single letter ("A." or "A").
    pub initial_only: bool,
}

impl ParsedName {
    /// First name suitable for gender inference: present and more than an initial.
    pub fn inferable_first_name(&self) -> Option<&str> {
        if self.initial_only {
            return None;
        }
        self.first_name.as_deref()
    }
}

pub fn parse_author_name(raw: &str) -> ParsedName {
    let (last_name, given_names) = match raw.matches(',').count() {
        0 => {
            let mut tokens: Vec<&str> = raw.split_whitespace().collect();
            let last = tokens.pop().unwrap_or("");
            (last.to_string(), tokens.join(" "))
        }
        _ => {
            // "Last, Given[, Suffix]"; the suffix plays no part in identity.
            let mut parts = raw.splitn(3, ',');
            let last = parts.next().unwrap_or("");
            let given = parts.next().unwrap_or("");
            (last.trim().to_string(), given.trim().to_string())
        }
    };

    let first_name = given_names
        .split_whitespace()
        .next()
        .map(|token| token.replace('.', ""))
        .filter(|token| !token.is_empty());
    let initial_only = first_name
        .as_deref()
        .is_some_and(|name| name.chars().count() == 1);

    ParsedName {
        last_name,
        given_names,
        first_name,
        initial_only,
    }
}

/// Canonical "Lastname, F." join key for author identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NameKey(String);

impl NameKey {
    pub fn from_raw(raw: &str) -> Self {
        Self::from_parsed(&parse_author_name(raw))
    }

    pub fn from_parsed(parsed: &ParsedName) -> Self {
        match parsed.given_names.chars().next() {
            Some(initial) => NameKey(format!("{}, {}.", parsed.last_name, initial)),
            None => NameKey(parsed.last_name.clone()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NameKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_last_first() {
        let p = parse_author_name("Casey, Andrew R.");
        assert_eq!(p.last_name, "Casey");
        assert_eq!(p.given_names, "Andrew R.");
        assert_eq!(p.first_name.as_deref(), Some("Andrew"));
        assert!(!p.initial_only);
        assert_eq!(p.inferable_first_name(), Some("Andrew"));
    }

    #[test]
    fn test_parse_first_last() {
        let p = parse_author_name("Daniel  Foreman-Mackey");
        assert_eq!(p.last_name, "Foreman-Mackey");
        assert_eq!(p.given_names, "Daniel");
    }

    #[test]
    fn test_parse_with_suffix() {
        let p = parse_author_name("Smith, John, Jr.");
        assert_eq!(p.last_name, "Smith");
        assert_eq!(p.given_names, "John");
    }

    #[test]
    fn test_initial_only() {
        let p = parse_author_name("Casey, A.");
        assert!(p.initial_only);
        assert_eq!(p.first_name.as_deref(), Some("A"));
        assert_eq!(p.inferable_first_name(), None);
    }

    #[test]
    fn test_no_given_names() {
        let p = parse_author_name("Planck Collaboration,");
        assert_eq!(p.first_name, None);
        assert!(!p.initial_only);
        assert_eq!(NameKey::from_parsed(&p).as_str(), "Planck Collaboration");
    }

    #[test]
    fn test_name_key_ignores_punctuation_and_spacing() {
        let full = NameKey::from_raw("Foreman-Mackey, Daniel");
        let initial = NameKey::from_raw("Foreman-Mackey, D.");
        let spaced = NameKey::from_raw("  Foreman-Mackey ,   D ");
        let natural = NameKey::from_raw("Daniel Foreman-Mackey");
        assert_eq!(full.as_str(), "Foreman-Mackey, D.");
        assert_eq!(full, initial);
        assert_eq!(full, spaced);
        assert_eq!(full, natural);
    }

    #[test]
    fn test_name_key_merges_shared_initial() {
        // Different people, same surname and initial: one key.
        assert_eq!(NameKey::from_raw("Casey, Andrew"), NameKey::from_raw("Casey, Amanda"));
        assert_ne!(NameKey::from_raw("Casey, Andrew"), NameKey::from_raw("Casey, Brian"));
    }

    #[test]
    fn test_name_key_serializes_as_string() {
        let key = NameKey::from_raw("Hogg, David W.");
        assert_eq!(serde_json::to_string(&key).unwrap(), "\"Hogg, D.\"");
    }
}
