//! Free-text search term handling.

use serde::{Deserialize, Serialize};

use storefront_core::ValueObject;

/// A non-empty, trimmed free-text search term.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SearchText(String);

impl SearchText {
    /// Trims the input; blank input means "no search".
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive substring pattern (`%term%`) with the term's own `%` and
    /// `_` escaped, so they match literally.
    pub fn like_pattern(&self) -> String {
        format!("%{}%", escape_like(&self.0))
    }
}

impl ValueObject for SearchText {}

/// Prefix every `%` and `_` with a backslash.
pub fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c == '%' || c == '_' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_search_is_absent() {
        assert_eq!(SearchText::parse(""), None);
        assert_eq!(SearchText::parse("   \t"), None);
        assert_eq!(SearchText::parse("  math ").unwrap().as_str(), "math");
    }

    #[test]
    fn pattern_escapes_wildcards() {
        let q = SearchText::parse("50% off_deal").unwrap();
        assert_eq!(q.like_pattern(), r"%50\% off\_deal%");
    }

    #[test]
    fn escape_leaves_other_characters_alone() {
        assert_eq!(escape_like("grade 4 (math)"), "grade 4 (math)");
        assert_eq!(escape_like("%%"), r"\%\%");
    }
}
