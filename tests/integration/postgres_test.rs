//! PostgreSQL integration tests.
//!
//! These tests require a running PostgreSQL database.
//! Set DATABASE_URL environment variable to run them.

use std::sync::Arc;
use std::time::{Duration, Instant};

use health_ask::config::DatabaseConfig;
use health_ask::db::{DatabaseClient, PostgresClient, ResultRow, SchemaDescriptor, Value};
use health_ask::error::AskError;
use health_ask::llm::MockLlmClient;
use health_ask::pipeline::{Pipeline, PipelineComponents, PipelineConfig};
use health_ask::safety::{validate, CandidateQuery, SafeQuery};
use sqlx::PgPool;

/// Helper to get test database config from environment.
fn get_test_config() -> Option<DatabaseConfig> {
    std::env::var("DATABASE_URL").ok().map(DatabaseConfig::from_url)
}

/// Helper to create a test client.
async fn get_test_client(config: &DatabaseConfig) -> Option<PostgresClient> {
    PostgresClient::connect(config).await.ok()
}

fn safe(sql: &str) -> SafeQuery {
    validate(&CandidateQuery::from(sql)).unwrap()
}

#[tokio::test]
async fn test_select_literals() {
    let Some(config) = get_test_config() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };
    let Some(client) = get_test_client(&config).await else {
        eprintln!("Skipping test: database unreachable");
        return;
    };

    let result = client
        .execute_query(&safe(
            "SELECT 1 AS num, 'hello' AS greeting, NULL::text AS nothing, true AS flag",
        ))
        .await
        .unwrap();

    assert_eq!(result.columns, vec!["num", "greeting", "nothing", "flag"]);
    let row: &ResultRow = &result.rows[0];
    assert_eq!(row.get("num"), Some(&Value::Int(1)));
    assert_eq!(row.get("greeting"), Some(&Value::String("hello".to_string())));
    assert_eq!(row.get("nothing"), Some(&Value::Null));
    assert_eq!(row.get("flag"), Some(&Value::Bool(true)));

    client.close().await.unwrap();
}

#[tokio::test]
async fn test_numeric_and_dates_serialize_as_json_scalars() {
    let Some(config) = get_test_config() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };
    let Some(client) = get_test_client(&config).await else {
        eprintln!("Skipping test: database unreachable");
        return;
    };

    let result = client
        .execute_query(&safe(
            "SELECT 12.50::numeric AS amount, DATE '2024-01-31' AS day",
        ))
        .await
        .unwrap();

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json[0]["amount"], serde_json::json!(12.5));
    assert_eq!(json[0]["day"], serde_json::json!("2024-01-31"));

    client.close().await.unwrap();
}

#[tokio::test]
async fn test_row_cap_truncates() {
    let Some(mut config) = get_test_config() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };
    config.max_rows = 10;
    let Some(client) = get_test_client(&config).await else {
        eprintln!("Skipping test: database unreachable");
        return;
    };

    let result = client
        .execute_query(&safe("SELECT g FROM generate_series(1, 25) AS g"))
        .await
        .unwrap();

    assert_eq!(result.len(), 10);
    assert_eq!(result.total_rows, 11);
    assert!(result.was_truncated);

    client.close().await.unwrap();
}

#[tokio::test]
async fn test_numeric_beyond_fixed_precision_range() {
    let Some(config) = get_test_config() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };
    let Some(client) = get_test_client(&config).await else {
        eprintln!("Skipping test: database unreachable");
        return;
    };

    let result = client
        .execute_query(&safe(
            "SELECT 1e30::numeric AS big, 1.0000000000000000000000000000001::numeric AS fine_scale",
        ))
        .await
        .unwrap();

    let row = &result.rows[0];
    match row.get("big") {
        Some(Value::Float(f)) => assert!((f / 1e30 - 1.0).abs() < 1e-12),
        other => panic!("expected a float, got {other:?}"),
    }
    match row.get("fine_scale") {
        Some(Value::Float(f)) => assert!((f - 1.0).abs() < 1e-12),
        other => panic!("expected a float, got {other:?}"),
    }

    client.close().await.unwrap();
}

#[tokio::test]
async fn test_row_cap_stops_reading_early() {
    let Some(mut config) = get_test_config() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };
    config.max_rows = 10;
    let Some(client) = get_test_client(&config).await else {
        eprintln!("Skipping test: database unreachable");
        return;
    };

    let result = client
        .execute_query(&safe("SELECT g FROM generate_series(1, 2000000) AS g"))
        .await
        .unwrap();

    assert_eq!(result.len(), 10);
    assert_eq!(result.total_rows, 11);
    assert!(result.was_truncated);

    client.close().await.unwrap();
}

#[tokio::test]
async fn test_statement_timeout_cancels_on_server() {
    let Some(mut config) = get_test_config() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };
    config.statement_timeout_secs = 1;
    let Some(client) = get_test_client(&config).await else {
        eprintln!("Skipping test: database unreachable");
        return;
    };

    let start = Instant::now();
    let err = client
        .execute_query(&safe("SELECT pg_sleep(6) AS health_ask_sleep_marker"))
        .await
        .unwrap_err();

    assert!(matches!(err, AskError::QueryExecution(_)));
    assert!(err.to_string().contains("timed out"));
    assert!(start.elapsed() < Duration::from_secs(3));

    // A separate session must not see the sleeping statement any more.
    let observer = PgPool::connect(config.url.as_deref().unwrap()).await.unwrap();
    let still_running: i64 = sqlx::query_scalar(
        "SELECT count(*) FROM pg_stat_activity \
         WHERE state = 'active' AND pid <> pg_backend_pid() \
         AND query LIKE '%health_ask_sleep_marker%'",
    )
    .fetch_one(&observer)
    .await
    .unwrap();
    assert_eq!(still_running, 0);

    observer.close().await;
    client.close().await.unwrap();
}

#[tokio::test]
async fn test_missing_table_through_pipeline() {
    let Some(config) = get_test_config() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };
    let Some(client) = get_test_client(&config).await else {
        eprintln!("Skipping test: database unreachable");
        return;
    };

    let llm = Arc::new(
        MockLlmClient::new().with_response("ghost", "SELECT * FROM \"ghost_table_does_not_exist\""),
    );
    let pipeline = Pipeline::new(PipelineComponents {
        llm: llm.clone(),
        db: Arc::new(client),
        schema: Arc::new(SchemaDescriptor::health()),
        config: PipelineConfig::default(),
    });

    let err = pipeline.handle_query("query the ghost table").await.unwrap_err();

    assert!(matches!(err, AskError::QueryExecution(_)));
    assert_eq!(err.public_message(), "Database query failed");
    assert_eq!(llm.narration_calls(), 0);
}
