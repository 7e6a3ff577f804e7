//! Search query grammar.
//!
//! A query is one free-text string of whitespace-separated tokens:
//!
//! - `-token` excludes matches (prefix stripped)
//! - `\token` switches the whole query to full-path matching and keeps
//!   the token itself (prefix stripped) when more than the prefix remains
//! - everything after the first `:` or `(` is dropped before tokenizing,
//!   so a pasted `name.txt:123` location still searches for the name
//! - literal `-` characters inside a token are stripped
//!
//! A query producing no tokens matches every record.

/// Parsed form of a search string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedQuery {
    /// Tokens that must all match, in order.
    pub include: Vec<String>,
    /// Tokens that must not match.
    pub exclude: Vec<String>,
    /// Match against the full path instead of the filename alone.
    pub match_full_path: bool,
}

/// Parse a raw search string.
#[must_use]
pub fn parse_query(raw: &str) -> ParsedQuery {
    let truncated = match raw.find([':', '(']) {
        Some(0) | None => raw,
        Some(at) => &raw[..at],
    };

    let mut parsed = ParsedQuery::default();

    for token in truncated.split_whitespace() {
        let is_exclude = token.starts_with('-');
        let is_full_path = token.starts_with('\\');
        if is_full_path {
            parsed.match_full_path = true;
            if token.len() <= 1 {
                continue;
            }
        }

        let body: String = token
            .strip_prefix('\\')
            .unwrap_or(token)
            .chars()
            .filter(|&c| c != '-')
            .collect();
        if body.is_empty() {
            continue;
        }

        if is_exclude {
            parsed.exclude.push(body);
        } else {
            parsed.include.push(body);
        }
    }

    parsed
}
