//! Lexical validation rules.
//!
//! Rules run in a fixed order and the first failing rule is reported, so the
//! same input always produces the same rejection.

use regex::Regex;
use std::sync::OnceLock;

use super::{CandidateQuery, RejectReason, SafeQuery, UnsafeQueryError};

/// Keywords associated with data/schema mutation or multi-query composition.
///
/// Checked in this order; the first match is the one reported.
pub const FORBIDDEN_KEYWORDS: [&str; 13] = [
    "INSERT",
    "UPDATE",
    "DELETE",
    "DROP",
    "ALTER",
    "TRUNCATE",
    "CREATE",
    "REPLACE",
    "GRANT",
    "REVOKE",
    "UNION",
    "EXCEPT",
    "INTERSECT",
];

/// Optional restrictions applied on top of the fixed rules.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidatorPolicy {
    /// When set, every `FROM`/`JOIN` target must be one of these tables.
    allowed_tables: Option<Vec<String>>,
}

impl ValidatorPolicy {
    /// The fixed rules only, with no table allow-list.
    pub fn permissive() -> Self {
        Self::default()
    }

    /// Restricts `FROM`/`JOIN` targets to the given table names.
    pub fn with_allowed_tables<I, S>(tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed_tables: Some(tables.into_iter().map(Into::into).collect()),
        }
    }

    /// Returns the allow-list, if enforced.
    pub fn allowed_tables(&self) -> Option<&[String]> {
        self.allowed_tables.as_deref()
    }
}

/// Validates a candidate with the fixed rules only.
pub fn validate(candidate: &CandidateQuery) -> Result<SafeQuery, UnsafeQueryError> {
    validate_with_policy(candidate, &ValidatorPolicy::permissive())
}

/// Validates a candidate against the fixed rules and the given policy.
pub fn validate_with_policy(
    candidate: &CandidateQuery,
    policy: &ValidatorPolicy,
) -> Result<SafeQuery, UnsafeQueryError> {
    let raw = candidate.as_str();
    if raw.trim().is_empty() {
        return Err(UnsafeQueryError::new(RejectReason::Empty));
    }

    // Case is preserved: the schema uses mixed-case quoted identifiers.
    let normalized = normalize_whitespace(raw);

    if !select_prefix().is_match(&normalized) {
        return Err(UnsafeQueryError::new(RejectReason::NotSelect));
    }

    if has_inner_terminator(&normalized) {
        return Err(UnsafeQueryError::new(RejectReason::MultiStatement));
    }

    if let Some(keyword) = find_forbidden_keyword(&normalized) {
        return Err(UnsafeQueryError::forbidden_keyword(keyword));
    }

    if let Some(allowed) = policy.allowed_tables() {
        if let Some(table) = find_unknown_table(&normalized, allowed) {
            return Err(UnsafeQueryError::unknown_table(table));
        }
    }

    Ok(SafeQuery::accepted(raw.trim().to_string()))
}

/// Collapses every whitespace run to a single space and trims the ends.
fn normalize_whitespace(sql: &str) -> String {
    sql.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn has_inner_terminator(normalized: &str) -> bool {
    let body = normalized.strip_suffix(';').unwrap_or(normalized);
    body.contains(';')
}

fn find_forbidden_keyword(normalized: &str) -> Option<&'static str> {
    FORBIDDEN_KEYWORDS
        .iter()
        .zip(keyword_patterns())
        .find(|(_, pattern)| pattern.is_match(normalized))
        .map(|(keyword, _)| *keyword)
}

/// Returns the first `FROM`/`JOIN` target missing from `allowed`.
///
/// Unquoted identifiers fold to lower case, as PostgreSQL does; quoted ones
/// compare exactly. Only the `public` schema qualifier is accepted.
fn find_unknown_table(normalized: &str, allowed: &[String]) -> Option<String> {
    for captures in table_reference().captures_iter(normalized) {
        let schema = captures.get(1).map(|m| fold_identifier(m.as_str()));
        let table = fold_identifier(captures.get(2).map_or("", |m| m.as_str()));

        let schema_ok = schema.as_deref().map_or(true, |s| s == "public");
        if !schema_ok || !allowed.iter().any(|t| *t == table) {
            // FROM and JOIN are both four characters long.
            return Some(captures[0][4..].trim().to_string());
        }
    }
    None
}

fn fold_identifier(identifier: &str) -> String {
    match identifier
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
    {
        Some(quoted) => quoted.to_string(),
        None => identifier.to_lowercase(),
    }
}

fn select_prefix() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)^SELECT\b").expect("static pattern compiles"))
}

/// `\b` is Unicode-aware, so a letter such as `é` counts as a word character.
fn keyword_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        FORBIDDEN_KEYWORDS
            .iter()
            .map(|keyword| {
                Regex::new(&format!(r"(?i)\b{}\b", regex::escape(keyword)))
                    .expect("static pattern compiles")
            })
            .collect()
    })
}

fn table_reference() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        let ident = r#"(?:"[^"]+"|[A-Za-z_][A-Za-z0-9_$]*)"#;
        Regex::new(&format!(
            r"(?i)\b(?:FROM|JOIN)\s+(?:({ident})\s*\.\s*)?({ident})"
        ))
        .expect("static pattern compiles")
    })
}
