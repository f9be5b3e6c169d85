//! Database abstraction layer for health-ask.
//!
//! Provides a trait-based interface for running validated queries, allowing
//! the PostgreSQL backend to be swapped for in-memory fakes in tests.

mod mock;
mod postgres;
pub mod schema;
mod types;

pub use mock::{FailingDatabaseClient, MockDatabaseClient};
pub use postgres::PostgresClient;
pub use schema::{ColumnDescriptor, ForeignKey, SchemaDescriptor, TableDescriptor};
pub use types::{decimal_to_value, ResultRow, ResultSet, Value};

use crate::config::DatabaseConfig;
use crate::error::Result;
use crate::safety::SafeQuery;
use async_trait::async_trait;

/// Creates a PostgreSQL client for the given configuration.
pub async fn connect(config: &DatabaseConfig) -> Result<Box<dyn DatabaseClient>> {
    let client = PostgresClient::connect(config).await?;
    Ok(Box::new(client))
}

/// Trait defining the interface for database clients.
///
/// Only a [`SafeQuery`] can be executed, so unvalidated text has no path to
/// the database.
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    /// Executes a single read-only statement and returns its rows.
    async fn execute_query(&self, query: &SafeQuery) -> Result<ResultSet>;

    /// Closes the database connection.
    async fn close(&self) -> Result<()>;
}
