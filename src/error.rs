//! Error types for health-ask.
//!
//! Every pipeline failure is one variant of [`AskError`]. Each variant carries
//! a machine-checkable code and an HTTP-equivalent status, separate from the
//! human-readable message, so callers never have to match on strings.

use serde::Serialize;
use thiserror::Error;

use crate::safety::{RejectReason, UnsafeQueryError};

/// Main error type for health-ask operations.
#[derive(Error, Debug)]
pub enum AskError {
    /// The generated query was rejected by the safety gate.
    #[error("SQL generation error: {0}")]
    SqlGeneration(UnsafeQueryError),

    /// The query ran successfully but returned no rows.
    #[error("No data found for the given query")]
    NoDataFound,

    /// Language model call failed (network, auth, malformed response).
    #[error("LLM error: {0}")]
    Llm(String),

    /// The database rejected or failed to run the query.
    #[error("Query execution error: {0}")]
    QueryExecution(String),

    /// Database connection errors (host unreachable, auth failed, etc.)
    #[error("Connection error: {0}")]
    Connection(String),

    /// Configuration errors (invalid config file, missing required fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal application errors (unexpected states, bugs, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Machine-readable error kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    SqlGeneration,
    NoDataFound,
    Llm,
    QueryExecution,
    Connection,
    Config,
    Internal,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SqlGeneration => "SQL_GENERATION",
            Self::NoDataFound => "NO_DATA_FOUND",
            Self::Llm => "LLM",
            Self::QueryExecution => "QUERY_EXECUTION",
            Self::Connection => "CONNECTION",
            Self::Config => "CONFIG",
            Self::Internal => "INTERNAL",
        }
    }
}

impl AskError {
    /// Creates an LLM error with the given message.
    pub fn llm(msg: impl Into<String>) -> Self {
        Self::Llm(msg.into())
    }

    /// Creates a query execution error with the given message.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::QueryExecution(msg.into())
    }

    /// Creates a connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::SqlGeneration(_) => ErrorCode::SqlGeneration,
            Self::NoDataFound => ErrorCode::NoDataFound,
            Self::Llm(_) => ErrorCode::Llm,
            Self::QueryExecution(_) => ErrorCode::QueryExecution,
            Self::Connection(_) => ErrorCode::Connection,
            Self::Config(_) => ErrorCode::Config,
            Self::Internal(_) => ErrorCode::Internal,
        }
    }

    /// The validator reason, when the error is a rejected query.
    pub fn reject_reason(&self) -> Option<RejectReason> {
        match self {
            Self::SqlGeneration(err) => Some(err.reason),
            _ => None,
        }
    }

    /// HTTP-equivalent status for the boundary layer.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::SqlGeneration(_) => 400,
            Self::NoDataFound => 404,
            Self::Llm(_) => 502,
            Self::QueryExecution(_) | Self::Connection(_) | Self::Config(_) | Self::Internal(_) => {
                500
            }
        }
    }

    /// Message that is safe to show to callers.
    ///
    /// Only validator rejections expose their reason; upstream and database
    /// detail stays in the logs.
    pub fn public_message(&self) -> String {
        match self {
            Self::SqlGeneration(err) => err.message(),
            Self::NoDataFound => "No data found for the given query".to_string(),
            Self::Llm(_) => "LLM service error".to_string(),
            Self::QueryExecution(_) => "Database query failed".to_string(),
            Self::Connection(_) | Self::Config(_) | Self::Internal(_) => {
                "Unexpected server error".to_string()
            }
        }
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::SqlGeneration(_) => "SQL Generation Error",
            Self::NoDataFound => "No Data Found",
            Self::Llm(_) => "LLM Error",
            Self::QueryExecution(_) => "Query Error",
            Self::Connection(_) => "Connection Error",
            Self::Config(_) => "Configuration Error",
            Self::Internal(_) => "Internal Error",
        }
    }
}

impl From<UnsafeQueryError> for AskError {
    fn from(err: UnsafeQueryError) -> Self {
        Self::SqlGeneration(err)
    }
}

/// JSON error payload handed to the boundary layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: ErrorCode,
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<RejectReason>,
}

impl From<&AskError> for ErrorBody {
    fn from(err: &AskError) -> Self {
        Self {
            error: err.public_message(),
            code: err.code(),
            status: err.status_code(),
            reason: err.reject_reason(),
        }
    }
}

/// Result type alias using AskError.
pub type Result<T> = std::result::Result<T, AskError>;
