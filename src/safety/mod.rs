//! Query safety gate.
//!
//! Every string that reaches the database passes through [`validate`] first.
//! The gate is lexical: it never parses SQL grammar, and it prefers rejecting
//! a legitimate query over accepting a dangerous one.

mod validator;

pub use validator::{validate, validate_with_policy, ValidatorPolicy, FORBIDDEN_KEYWORDS};

use serde::{Serialize, Serializer};
use std::fmt;
use thiserror::Error;

/// Raw model output awaiting validation. Never executed directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateQuery(String);

impl CandidateQuery {
    pub fn new(sql: impl Into<String>) -> Self {
        Self(sql.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CandidateQuery {
    fn from(sql: &str) -> Self {
        Self::new(sql)
    }
}

impl From<String> for CandidateQuery {
    fn from(sql: String) -> Self {
        Self(sql)
    }
}

/// A query that has been accepted by the validator.
///
/// The only constructor lives in the validator, so holding a `SafeQuery`
/// proves the text passed every rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafeQuery(String);

impl SafeQuery {
    pub(crate) fn accepted(sql: String) -> Self {
        Self(sql)
    }

    /// Returns the accepted SQL text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

}

impl fmt::Display for SafeQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for SafeQuery {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// Why a candidate query was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectReason {
    /// Empty or whitespace-only input.
    Empty,
    /// The query does not start with `SELECT`.
    NotSelect,
    /// A statement terminator appears before the final character.
    MultiStatement,
    /// A mutation or set-operation keyword was found.
    ForbiddenKeyword,
    /// A `FROM`/`JOIN` target is outside the table allow-list.
    UnknownTable,
}

impl RejectReason {
    /// Returns the stable machine-readable code for this reason.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Empty => "EMPTY",
            Self::NotSelect => "NOT_SELECT",
            Self::MultiStatement => "MULTI_STATEMENT",
            Self::ForbiddenKeyword => "FORBIDDEN_KEYWORD",
            Self::UnknownTable => "UNKNOWN_TABLE",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl Serialize for RejectReason {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

/// Rejection raised by the validator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", self.message())]
pub struct UnsafeQueryError {
    /// The rule that failed.
    pub reason: RejectReason,
    /// The denylisted keyword that matched, for `FORBIDDEN_KEYWORD`.
    pub keyword: Option<String>,
    /// The offending table, for `UNKNOWN_TABLE`.
    pub table: Option<String>,
}

impl UnsafeQueryError {
    pub fn new(reason: RejectReason) -> Self {
        Self {
            reason,
            keyword: None,
            table: None,
        }
    }

    pub fn forbidden_keyword(keyword: impl Into<String>) -> Self {
        Self {
            keyword: Some(keyword.into()),
            ..Self::new(RejectReason::ForbiddenKeyword)
        }
    }

    pub fn unknown_table(table: impl Into<String>) -> Self {
        Self {
            table: Some(table.into()),
            ..Self::new(RejectReason::UnknownTable)
        }
    }

    /// Human-readable description of the rejection.
    pub fn message(&self) -> String {
        match self.reason {
            RejectReason::Empty => "Empty SQL generated".to_string(),
            RejectReason::NotSelect => "Only SELECT statements are allowed".to_string(),
            RejectReason::MultiStatement => {
                "Semicolon allowed only at the end of the query".to_string()
            }
            RejectReason::ForbiddenKeyword => format!(
                "Forbidden SQL keyword detected: {}",
                self.keyword.as_deref().unwrap_or("?")
            ),
            RejectReason::UnknownTable => format!(
                "Unknown or unsafe table used: {}",
                self.table.as_deref().unwrap_or("?")
            ),
        }
    }
}
