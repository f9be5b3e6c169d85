//! Plain-language explanation of query results.

use std::sync::Arc;

use tracing::{error, warn};

use crate::db::ResultSet;
use crate::error::{AskError, Result};
use crate::llm::prompt::{build_narration_user_prompt, DISCLAIMER, NARRATION_SYSTEM_PROMPT};
use crate::llm::{CompletionRequest, LlmClient};
use crate::safety::SafeQuery;

pub struct Narrator {
    llm: Arc<dyn LlmClient>,
    temperature: f32,
    enforce_disclaimer: bool,
}

impl Narrator {
    pub fn new(llm: Arc<dyn LlmClient>, temperature: f32) -> Self {
        Self {
            llm,
            temperature,
            enforce_disclaimer: false,
        }
    }

    /// Fail narratives that do not contain the disclaimer sentence.
    pub fn with_enforced_disclaimer(mut self, enforce: bool) -> Self {
        self.enforce_disclaimer = enforce;
        self
    }

    /// Explains `rows` in the context of the question and the SQL that produced them.
    pub async fn narrate(&self, question: &str, query: &SafeQuery, rows: &ResultSet) -> Result<String> {
        let request = CompletionRequest::new(
            NARRATION_SYSTEM_PROMPT,
            build_narration_user_prompt(question, query, rows),
        )
        .with_temperature(self.temperature);

        let answer = self.llm.complete(&request).await.map_err(|e| {
            error!(error = %e, "Narration call failed");
            e
        })?;

        if self.enforce_disclaimer && !answer.contains(DISCLAIMER) {
            warn!("Narrative is missing the disclaimer");
            return Err(AskError::llm("Narrative is missing the required disclaimer"));
        }

        Ok(answer)
    }
}
