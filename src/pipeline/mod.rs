//! Question answering pipeline.
//!
//! One request runs generate, execute, then narrate, strictly in that order:
//!
//! ```text
//! Generating -> Executing -> Narrating -> Done
//!      \            \            \
//!       +------------+------------+--> Failed
//! ```
//!
//! An empty result set ends the request with [`AskError::NoDataFound`] before
//! the narrator is consulted. Nothing is retried at this level.
//!
//! [`Pipeline::handle_query_isolated`] runs a request on its own task, so a
//! panic in a collaborator surfaces as [`AskError::Internal`] instead of
//! taking the caller down.

pub mod executor;
pub mod generator;
pub mod narrator;

pub use executor::QueryExecutor;
pub use generator::QueryGenerator;
pub use narrator::Narrator;

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::db::{DatabaseClient, ResultSet, SchemaDescriptor};
use crate::error::{AskError, Result};
use crate::llm::types::DEFAULT_TEMPERATURE;
use crate::llm::LlmClient;
use crate::safety::{RejectReason, SafeQuery, UnsafeQueryError, ValidatorPolicy};

/// Position of a request in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Generating,
    Executing,
    Narrating,
    Done,
    Failed,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Generating => "generating",
            Self::Executing => "executing",
            Self::Narrating => "narrating",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    /// Whether no further transition can happen.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Behavior switches for a [`Pipeline`].
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Sampling temperature for both model calls.
    pub temperature: f32,
    /// Restrict `FROM`/`JOIN` targets to the schema's tables.
    pub enforce_table_allowlist: bool,
    /// Reject narratives without the disclaimer sentence.
    pub enforce_disclaimer: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            enforce_table_allowlist: false,
            enforce_disclaimer: false,
        }
    }
}

impl From<&Config> for PipelineConfig {
    fn from(config: &Config) -> Self {
        Self {
            temperature: config.llm.temperature,
            enforce_table_allowlist: config.validator.enforce_table_allowlist,
            enforce_disclaimer: config.narrator.enforce_disclaimer,
        }
    }
}

/// Collaborators a [`Pipeline`] is assembled from.
pub struct PipelineComponents {
    pub llm: Arc<dyn LlmClient>,
    pub db: Arc<dyn DatabaseClient>,
    pub schema: Arc<SchemaDescriptor>,
    pub config: PipelineConfig,
}

/// Successful answer to one question.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutcome {
    pub question: String,
    pub sql: SafeQuery,
    pub result: ResultSet,
    pub answer: String,
}

/// Answers natural-language questions about the health dataset.
pub struct Pipeline {
    generator: QueryGenerator,
    executor: QueryExecutor,
    narrator: Narrator,
}

impl Pipeline {
    pub fn new(components: PipelineComponents) -> Self {
        let PipelineComponents {
            llm,
            db,
            schema,
            config,
        } = components;

        let policy = if config.enforce_table_allowlist {
            ValidatorPolicy::with_allowed_tables(schema.table_names())
        } else {
            ValidatorPolicy::permissive()
        };

        Self {
            generator: QueryGenerator::new(llm.clone(), schema, policy, config.temperature),
            executor: QueryExecutor::new(db),
            narrator: Narrator::new(llm, config.temperature)
                .with_enforced_disclaimer(config.enforce_disclaimer),
        }
    }

    /// Runs one full request. Each call is independent of every other.
    ///
    /// The outcome echoes `question` exactly as given.
    pub async fn handle_query(&self, question: &str) -> Result<PipelineOutcome> {
        let start = Instant::now();

        if question.trim().is_empty() {
            debug!(stage = %Stage::Failed, "Blank question");
            return Err(UnsafeQueryError::new(RejectReason::Empty).into());
        }

        let result = self.run(question).await;
        let stage = if result.is_ok() { Stage::Done } else { Stage::Failed };
        debug!(
            stage = %stage,
            total_duration_ms = start.elapsed().as_millis(),
            "Request finished"
        );
        result
    }

    /// Like [`Pipeline::handle_query`], but on a spawned task. A panic inside
    /// the request becomes [`AskError::Internal`].
    pub async fn handle_query_isolated(
        self: Arc<Self>,
        question: String,
    ) -> Result<PipelineOutcome> {
        let task = tokio::spawn(async move { self.handle_query(&question).await });
        match task.await {
            Ok(result) => result,
            Err(e) => {
                error!(stage = %Stage::Failed, "Request task aborted: {e}");
                Err(AskError::internal(format!("Request task aborted: {e}")))
            }
        }
    }

    async fn run(&self, question: &str) -> Result<PipelineOutcome> {
        debug!(stage = %Stage::Generating, "Entering stage");
        let sql = self.generator.generate(question).await?;

        debug!(stage = %Stage::Executing, "Entering stage");
        let result = self.executor.execute(&sql).await?;

        if result.is_empty() {
            info!(sql = %sql, "Query returned no rows");
            return Err(AskError::NoDataFound);
        }

        debug!(stage = %Stage::Narrating, rows = result.len(), "Entering stage");
        let answer = self.narrator.narrate(question, &sql, &result).await?;

        Ok(PipelineOutcome {
            question: question.to_string(),
            sql,
            result,
            answer,
        })
    }
}
