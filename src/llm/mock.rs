//! Mock LLM clients for testing.
//!
//! Provide deterministic responses based on input patterns and record every
//! request, so tests can assert which model calls happened.

use async_trait::async_trait;
use std::sync::Mutex;

use crate::error::{AskError, Result};
use crate::llm::prompt::{DISCLAIMER, NARRATION_SYSTEM_PROMPT};
use crate::llm::types::{CompletionRequest, Role};
use crate::llm::LlmClient;

/// Mock LLM client that returns canned responses based on input patterns.
///
/// Requests whose system instruction is the narration prompt get the
/// narration response; every other request is treated as SQL generation.
#[derive(Debug, Default)]
pub struct MockLlmClient {
    /// Custom SQL response mappings (pattern -> response).
    custom_responses: Vec<(String, String)>,
    /// Narration override.
    narration: Option<String>,
    /// Whether narration requests should fail.
    fail_narration: bool,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockLlmClient {
    /// Creates a new mock client with default responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a custom SQL response mapping.
    ///
    /// When the question contains `pattern`, the mock will return `response`.
    pub fn with_response(
        mut self,
        pattern: impl Into<String>,
        response: impl Into<String>,
    ) -> Self {
        self.custom_responses
            .push((pattern.into(), response.into()));
        self
    }

    /// Replaces the default narration text.
    pub fn with_narration(mut self, narration: impl Into<String>) -> Self {
        self.narration = Some(narration.into());
        self
    }

    /// Makes narration requests fail with an LLM error.
    pub fn failing_narration(mut self) -> Self {
        self.fail_narration = true;
        self
    }

    /// Returns every request received so far, in order.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Number of narration requests received so far.
    pub fn narration_calls(&self) -> usize {
        self.requests()
            .iter()
            .filter(|r| is_narration(r))
            .count()
    }

    /// Number of SQL generation requests received so far.
    pub fn generation_calls(&self) -> usize {
        self.requests()
            .iter()
            .filter(|r| !is_narration(r))
            .count()
    }

    /// Generates a mock SQL response based on the question.
    fn mock_sql(&self, input: &str) -> String {
        let input_lower = input.to_lowercase();

        // Check custom responses first
        for (pattern, response) in &self.custom_responses {
            if input_lower.contains(&pattern.to_lowercase()) {
                return response.clone();
            }
        }

        if input_lower.contains("how many patients") {
            return "```sql\nSELECT COUNT(*) AS patient_count FROM \"health_static\";\n```"
                .to_string();
        }

        if input_lower.contains("average bmi") {
            return "```sql\nSELECT \"Sex\", AVG(\"BMI\") AS avg_bmi FROM \"health_static\" GROUP BY \"Sex\";\n```"
                .to_string();
        }

        if input_lower.contains("steps") {
            return "```sql\nSELECT h.\"Patient_Number\", AVG(s.\"Physical_activity\") AS avg_steps\nFROM \"health_static\" h\nJOIN \"steps_daily\" s ON s.\"Patient_Number\" = h.\"Patient_Number\"\nGROUP BY h.\"Patient_Number\"\nLIMIT 10;\n```"
                .to_string();
        }

        if input_lower.contains("delete") || input_lower.contains("remove") {
            return "```sql\nDELETE FROM \"health_static\" WHERE \"Age\" > 90;\n```".to_string();
        }

        "I don't understand that question. Could you please rephrase it?".to_string()
    }

    fn mock_narration(&self) -> String {
        self.narration.clone().unwrap_or_else(|| {
            format!("The query returned the requested figures from the dataset. {DISCLAIMER}")
        })
    }
}

fn is_narration(request: &CompletionRequest) -> bool {
    request.content_of(Role::System) == Some(NARRATION_SYSTEM_PROMPT)
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(request.clone());

        if is_narration(request) {
            if self.fail_narration {
                return Err(AskError::llm("mock narration failure"));
            }
            return Ok(self.mock_narration());
        }

        let input = request.content_of(Role::User).unwrap_or_default();
        Ok(self.mock_sql(input))
    }
}

/// An LLM client whose every call fails.
#[derive(Debug, Clone)]
pub struct FailingLlmClient {
    message: String,
}

impl FailingLlmClient {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl LlmClient for FailingLlmClient {
    async fn complete(&self, _request: &CompletionRequest) -> Result<String> {
        Err(AskError::llm(self.message.clone()))
    }
}
