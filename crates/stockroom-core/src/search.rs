//! # Search Module
//!
//! Token matching used by history search and item name search.
//!
//! ## Matching Rule
//! ```text
//! query: "ivan  widget"
//!          │
//!          ▼
//! tokens: ["ivan", "widget"]          (split on whitespace, lowercased)
//!          │
//!          ▼
//! row matches if ANY token is a substring of ANY searchable field
//! (username, buyer, extra_info, before_change, after_change,
//!  history_type, title), compared case-insensitively
//! ```
//!
//! Lowercasing uses Unicode rules, so Cyrillic and other non-ASCII names
//! match regardless of case. SQLite's `LOWER()`/`LIKE` only fold ASCII, which
//! is why this runs in Rust rather than in SQL.

/// A parsed search query.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchQuery {
    tokens: Vec<String>,
}

impl SearchQuery {
    /// Tokenizes `query` on whitespace.
    ///
    /// ```rust
    /// use stockroom_core::search::SearchQuery;
    ///
    /// let query = SearchQuery::parse("  Ivan   WIDGET ");
    /// assert_eq!(query.tokens(), ["ivan", "widget"]);
    /// assert!(SearchQuery::parse("   ").is_empty());
    /// ```
    pub fn parse(query: &str) -> Self {
        SearchQuery {
            tokens: query.split_whitespace().map(str::to_lowercase).collect(),
        }
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// True when the query has no tokens. An empty query matches everything.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Checks whether any token occurs in any of the given fields.
    ///
    /// `None` fields (e.g. a retail entry's buyer) never match.
    ///
    /// ```rust
    /// use stockroom_core::search::SearchQuery;
    ///
    /// let query = SearchQuery::parse("acme nothing");
    /// assert!(query.matches_any(&[Some("alice"), Some("ACME Corp"), None]));
    /// assert!(!query.matches_any(&[Some("alice"), None]));
    /// ```
    pub fn matches_any(&self, fields: &[Option<&str>]) -> bool {
        if self.is_empty() {
            return true;
        }

        fields.iter().flatten().any(|field| {
            let field = field.to_lowercase();
            self.tokens.iter().any(|token| field.contains(token.as_str()))
        })
    }
}

/// Case-insensitive substring match of `needle` in `haystack`.
///
/// ```rust
/// use stockroom_core::search::contains_ignore_case;
///
/// assert!(contains_ignore_case("Blue Widget", "widget"));
/// assert!(contains_ignore_case("ШУРУП", "шуруп"));
/// assert!(contains_ignore_case("anything", ""));
/// ```
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_query_matches_everything() {
        let query = SearchQuery::parse("");
        assert!(query.matches_any(&[None]));
        assert!(query.matches_any(&[]));
    }

    #[test]
    fn test_any_token_any_field() {
        let query = SearchQuery::parse("opt bob");
        // history_type field
        assert!(query.matches_any(&[Some("alice"), Some("opt")]));
        // username field
        assert!(query.matches_any(&[Some("Bob"), Some("sale")]));
        assert!(!query.matches_any(&[Some("alice"), Some("sale")]));
    }

    #[test]
    fn test_matches_inside_json_text() {
        let query = SearchQuery::parse("гвоздь");
        let after = r#"[{"name":"Гвоздь 100мм","quantity":3,"price":0.5}]"#;
        assert!(query.matches_any(&[Some("alice"), Some(after)]));
    }

    #[test]
    fn test_substring_not_whole_word() {
        let query = SearchQuery::parse("idg");
        assert!(query.matches_any(&[Some("Widget")]));
    }
}
