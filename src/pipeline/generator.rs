//! Natural language to validated SQL.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, warn};

use crate::db::SchemaDescriptor;
use crate::error::Result;
use crate::llm::prompt::{build_sql_system_prompt, build_sql_user_prompt};
use crate::llm::{strip_code_fences, CompletionRequest, LlmClient};
use crate::logging::AUDIT_TARGET;
use crate::safety::{validate_with_policy, CandidateQuery, SafeQuery, ValidatorPolicy};

/// Turns a question into a [`SafeQuery`] with a single model call.
///
/// A rejected candidate is reported as-is; there is no second attempt.
pub struct QueryGenerator {
    llm: Arc<dyn LlmClient>,
    schema: Arc<SchemaDescriptor>,
    policy: ValidatorPolicy,
    temperature: f32,
}

impl QueryGenerator {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        schema: Arc<SchemaDescriptor>,
        policy: ValidatorPolicy,
        temperature: f32,
    ) -> Self {
        Self {
            llm,
            schema,
            policy,
            temperature,
        }
    }

    pub async fn generate(&self, question: &str) -> Result<SafeQuery> {
        let request = CompletionRequest::new(
            build_sql_system_prompt(&self.schema),
            build_sql_user_prompt(question),
        )
        .with_temperature(self.temperature);

        let llm_start = Instant::now();
        let raw = self.llm.complete(&request).await.map_err(|e| {
            error!(error = %e, "SQL generation call failed");
            e
        })?;
        debug!(
            llm_duration_ms = llm_start.elapsed().as_millis(),
            response_len = raw.len(),
            "Received SQL candidate"
        );

        let candidate = CandidateQuery::new(strip_code_fences(&raw));
        match validate_with_policy(&candidate, &self.policy) {
            Ok(query) => {
                info!(
                    target: AUDIT_TARGET,
                    question = %question,
                    sql = %query,
                    "Accepted generated SQL"
                );
                Ok(query)
            }
            Err(rejection) => {
                warn!(
                    reason = %rejection.reason,
                    sql = %candidate.as_str(),
                    "Rejected generated SQL: {}",
                    rejection
                );
                Err(rejection.into())
            }
        }
    }
}
