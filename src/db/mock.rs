//! Mock database clients for testing.
//!
//! Provide canned results and failures without a running PostgreSQL server.

use super::{DatabaseClient, ResultRow, ResultSet};
use crate::error::{AskError, Result};
use crate::safety::SafeQuery;
use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

/// A mock database client that returns a predefined result set.
#[derive(Debug)]
pub struct MockDatabaseClient {
    result: ResultSet,
    executed: Mutex<Vec<String>>,
}

impl MockDatabaseClient {
    /// Creates a mock that answers every query with one sample row.
    pub fn new() -> Self {
        let row = ResultRow::new()
            .with("patient_count", 2000i64)
            .with("avg_bmi", 24.85);
        Self::with_result(ResultSet::with_rows(
            vec!["patient_count".to_string(), "avg_bmi".to_string()],
            vec![row],
        ))
    }

    /// Creates a mock that always returns zero rows.
    pub fn empty() -> Self {
        Self::with_result(ResultSet::new())
    }

    /// Creates a mock that always returns `result`.
    pub fn with_result(result: ResultSet) -> Self {
        Self {
            result,
            executed: Mutex::new(Vec::new()),
        }
    }

    /// Returns every query executed so far, in order.
    pub fn executed_queries(&self) -> Vec<String> {
        self.executed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl Default for MockDatabaseClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DatabaseClient for MockDatabaseClient {
    async fn execute_query(&self, query: &SafeQuery) -> Result<ResultSet> {
        self.executed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(query.as_str().to_string());

        Ok(self
            .result
            .clone()
            .with_execution_time(Duration::from_millis(1)))
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// A database client whose every query fails.
#[derive(Debug, Clone)]
pub struct FailingDatabaseClient {
    message: String,
}

impl FailingDatabaseClient {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Default for FailingDatabaseClient {
    fn default() -> Self {
        Self::new("connection refused")
    }
}

#[async_trait]
impl DatabaseClient for FailingDatabaseClient {
    async fn execute_query(&self, _query: &SafeQuery) -> Result<ResultSet> {
        Err(AskError::connection(self.message.clone()))
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::safety::{validate, CandidateQuery};

    fn safe(sql: &str) -> SafeQuery {
        validate(&CandidateQuery::from(sql)).unwrap()
    }

    #[tokio::test]
    async fn test_mock_returns_sample_row() {
        let client = MockDatabaseClient::new();
        let result = client.execute_query(&safe("SELECT 1")).await.unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result.columns.len(), 2);
        assert_eq!(client.executed_queries(), vec!["SELECT 1"]);
    }

    #[tokio::test]
    async fn test_mock_empty() {
        let client = MockDatabaseClient::empty();
        let result = client.execute_query(&safe("SELECT 1")).await.unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_failing_client() {
        let client = FailingDatabaseClient::new("could not connect to server");
        let err = client.execute_query(&safe("SELECT 1")).await.unwrap_err();
        assert!(err.to_string().contains("could not connect"));
    }
}
