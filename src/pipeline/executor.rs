//! Runs validated queries against the database collaborator.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error};

use crate::db::{DatabaseClient, ResultSet};
use crate::error::{AskError, Result};
use crate::safety::SafeQuery;

/// Query executor that delegates to a [`DatabaseClient`].
///
/// Every failure surfaces as [`AskError::QueryExecution`], whatever the
/// client reported. There is no retry.
pub struct QueryExecutor {
    db: Arc<dyn DatabaseClient>,
}

impl QueryExecutor {
    pub fn new(db: Arc<dyn DatabaseClient>) -> Self {
        Self { db }
    }

    pub async fn execute(&self, query: &SafeQuery) -> Result<ResultSet> {
        let start = Instant::now();
        let result = self.db.execute_query(query).await;
        let elapsed = start.elapsed();

        match result {
            Ok(result_set) => {
                debug!(
                    duration_ms = elapsed.as_millis(),
                    row_count = result_set.len(),
                    truncated = result_set.was_truncated,
                    "Query executed"
                );
                Ok(result_set)
            }
            Err(e) => {
                let detail = match e {
                    AskError::QueryExecution(msg) => msg,
                    other => other.to_string(),
                };
                error!(
                    duration_ms = elapsed.as_millis(),
                    sql = %query,
                    "Query execution failed: {}",
                    detail
                );
                Err(AskError::QueryExecution(detail))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{FailingDatabaseClient, MockDatabaseClient};
    use crate::safety::{validate, CandidateQuery};

    fn query(sql: &str) -> SafeQuery {
        validate(&CandidateQuery::from(sql)).unwrap()
    }

    #[tokio::test]
    async fn test_execute_returns_rows() {
        let db = Arc::new(MockDatabaseClient::new());
        let executor = QueryExecutor::new(db.clone());

        let result = executor
            .execute(&query("SELECT COUNT(*) FROM health_static"))
            .await
            .unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(db.executed_queries(), vec!["SELECT COUNT(*) FROM health_static"]);
    }

    #[tokio::test]
    async fn test_execute_maps_failures_to_query_execution() {
        let executor = QueryExecutor::new(Arc::new(FailingDatabaseClient::new(
            "relation \"health_static\" does not exist",
        )));

        let err = executor
            .execute(&query("SELECT * FROM health_static"))
            .await
            .unwrap_err();

        match err {
            AskError::QueryExecution(msg) => assert!(msg.contains("does not exist")),
            other => panic!("expected QueryExecution, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_execute_empty_result_is_not_an_error() {
        let executor = QueryExecutor::new(Arc::new(MockDatabaseClient::empty()));
        let result = executor.execute(&query("SELECT 1")).await.unwrap();
        assert!(result.is_empty());
    }
}
