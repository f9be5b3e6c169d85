//! End-to-end pipeline tests with in-memory collaborators.
//!
//! Exercises the public API the way the binary does: build a pipeline from
//! components, ask a question, inspect the outcome or the error body.

use std::sync::Arc;

use health_ask::db::{
    DatabaseClient, FailingDatabaseClient, MockDatabaseClient, ResultRow, ResultSet,
    SchemaDescriptor,
};
use health_ask::error::{AskError, ErrorBody, ErrorCode};
use health_ask::llm::prompt::DISCLAIMER;
use health_ask::llm::{LlmClient, MockLlmClient};
use health_ask::pipeline::{Pipeline, PipelineComponents, PipelineConfig};
use health_ask::safety::RejectReason;
use pretty_assertions::assert_eq;

fn build(llm: Arc<dyn LlmClient>, db: Arc<dyn DatabaseClient>, config: PipelineConfig) -> Pipeline {
    Pipeline::new(PipelineComponents {
        llm,
        db,
        schema: Arc::new(SchemaDescriptor::health()),
        config,
    })
}

#[tokio::test]
async fn test_chained_statement_is_rejected_before_execution() {
    let llm = Arc::new(MockLlmClient::new().with_response(
        "drop",
        "SELECT * FROM health_static; DROP TABLE health_static;",
    ));
    let db = Arc::new(MockDatabaseClient::new());
    let pipeline = build(llm.clone(), db.clone(), PipelineConfig::default());

    let err = pipeline
        .handle_query("Show everything then drop it")
        .await
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::SqlGeneration);
    assert_eq!(err.reject_reason(), Some(RejectReason::MultiStatement));
    assert!(db.executed_queries().is_empty());
    assert_eq!(llm.narration_calls(), 0);
}

#[tokio::test]
async fn test_lowercase_select_is_executed() {
    let llm = Arc::new(
        MockLlmClient::new().with_response("age", "select \"Age\", \"BMI\" from health_static"),
    );
    let row = ResultRow::new().with("Age", 42i64).with("BMI", 22.1);
    let db = Arc::new(MockDatabaseClient::with_result(ResultSet::with_rows(
        vec!["Age".into(), "BMI".into()],
        vec![row],
    )));
    let pipeline = build(llm.clone(), db.clone(), PipelineConfig::default());

    let outcome = pipeline.handle_query("List age and BMI").await.unwrap();

    assert_eq!(outcome.sql.as_str(), "select \"Age\", \"BMI\" from health_static");
    assert_eq!(
        db.executed_queries(),
        vec!["select \"Age\", \"BMI\" from health_static"]
    );
    assert!(outcome.answer.contains(DISCLAIMER));
    assert_eq!(llm.narration_calls(), 1);
}

#[tokio::test]
async fn test_zero_rows_yields_no_data_found() {
    let llm = Arc::new(MockLlmClient::new());
    let db = Arc::new(MockDatabaseClient::empty());
    let pipeline = build(llm.clone(), db, PipelineConfig::default());

    let err = pipeline
        .handle_query("How many patients are over 120?")
        .await
        .unwrap_err();

    assert!(matches!(err, AskError::NoDataFound));
    assert_eq!(llm.generation_calls(), 1);
    assert_eq!(llm.narration_calls(), 0);

    let body = serde_json::to_value(ErrorBody::from(&err)).unwrap();
    assert_eq!(
        body,
        serde_json::json!({
            "error": "No data found for the given query",
            "code": "NO_DATA_FOUND",
            "status": 404,
        })
    );
}

#[tokio::test]
async fn test_connectivity_failure_yields_query_execution_error() {
    let llm = Arc::new(MockLlmClient::new());
    let db = Arc::new(FailingDatabaseClient::new("connection reset by peer"));
    let pipeline = build(llm.clone(), db, PipelineConfig::default());

    let err = pipeline
        .handle_query("How many patients are there?")
        .await
        .unwrap_err();

    assert!(matches!(err, AskError::QueryExecution(_)));
    assert_eq!(err.status_code(), 500);
    assert_eq!(llm.narration_calls(), 0);

    // Driver detail stays out of the caller-facing body.
    let body = ErrorBody::from(&err);
    assert_eq!(body.error, "Database query failed");
    assert!(!body.error.contains("reset"));
}

#[tokio::test]
async fn test_requests_are_independent() {
    let llm = Arc::new(MockLlmClient::new());
    let db = Arc::new(MockDatabaseClient::new());
    let pipeline = build(llm.clone(), db.clone(), PipelineConfig::default());

    assert!(pipeline.handle_query("Delete everything").await.is_err());
    assert!(pipeline
        .handle_query("How many patients are there?")
        .await
        .is_ok());

    assert_eq!(db.executed_queries().len(), 1);
    assert_eq!(llm.generation_calls(), 2);
    assert_eq!(llm.narration_calls(), 1);
}

#[tokio::test]
async fn test_join_question_passes_allowlist() {
    let llm = Arc::new(MockLlmClient::new());
    let db = Arc::new(MockDatabaseClient::new());
    let config = PipelineConfig {
        enforce_table_allowlist: true,
        ..PipelineConfig::default()
    };
    let pipeline = build(llm, db.clone(), config);

    let outcome = pipeline
        .handle_query("Average steps per patient")
        .await
        .unwrap();

    assert!(outcome.sql.as_str().contains("JOIN \"steps_daily\""));
    assert_eq!(db.executed_queries().len(), 1);
}

#[tokio::test]
async fn test_enforced_disclaimer_rejects_bare_narrative() {
    let llm = Arc::new(MockLlmClient::new().with_narration("There are 2000 patients."));
    let config = PipelineConfig {
        enforce_disclaimer: true,
        ..PipelineConfig::default()
    };
    let pipeline = build(llm, Arc::new(MockDatabaseClient::new()), config);

    let err = pipeline
        .handle_query("How many patients are there?")
        .await
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::Llm);
    assert_eq!(err.public_message(), "LLM service error");
}
