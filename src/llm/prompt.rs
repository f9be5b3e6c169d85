//! Prompt construction for LLM requests.
//!
//! Two fixed system instructions: one for SQL generation (with the schema
//! embedded) and one for narrating results.

use crate::db::{ResultSet, SchemaDescriptor};
use crate::safety::SafeQuery;

/// Sentence every narrative must end with.
pub const DISCLAIMER: &str = "This is not medical advice. Please consult a healthcare professional.";

/// System prompt template for SQL generation.
const SQL_SYSTEM_PROMPT_TEMPLATE: &str = r#"You are a data analyst. You must generate a single, read-only SQL query
for a PostgreSQL database, based strictly on the schema provided.

Rules:
- Use ONLY SELECT statements.
- NEVER use INSERT, UPDATE, DELETE, DROP, ALTER, TRUNCATE,
  CREATE, REPLACE, GRANT, REVOKE or any statement that modifies data or schema.
- Do not combine queries with UNION, EXCEPT or INTERSECT.
- Use only the tables and columns listed in the schema.
- Join health_static and steps_daily on Patient_Number when needed.
- The output MUST be valid PostgreSQL syntax.
- Do NOT include explanations, comments, or markdown. Return ONLY the raw SQL query.

IMPORTANT:
PostgreSQL column names in this schema contain capital letters.
You MUST wrap all table and column names in double quotes, for example "BMI", "Sex", "Age".
If you do not use double quotes, the query will fail.

Schema:
{schema}"#;

/// System prompt for narrating query results.
pub const NARRATION_SYSTEM_PROMPT: &str = r#"You are a medical data analyst (not a doctor).
Given a user question, the SQL that was executed, and the SQL result rows:

Your task:
1. Describe what the data shows in clear, non-technical language.
2. Do NOT provide any medical advice, diagnosis, or lifestyle recommendations.
3. Do NOT speculate beyond what is directly supported by the data.
4. Always end with: "This is not medical advice. Please consult a healthcare professional."

Only explain the data returned by the query."#;

/// Builds the SQL generation system prompt with the schema injected.
pub fn build_sql_system_prompt(schema: &SchemaDescriptor) -> String {
    SQL_SYSTEM_PROMPT_TEMPLATE.replace("{schema}", &schema.format_for_llm())
}

/// Builds the per-request SQL generation instruction.
pub fn build_sql_user_prompt(question: &str) -> String {
    format!(
        "User question:\n{question}\n\nReturn a SINGLE PostgreSQL SELECT query, no comments, no markdown, no explanation."
    )
}

/// Builds the narration instruction with the executed query and its rows.
pub fn build_narration_user_prompt(question: &str, query: &SafeQuery, rows: &ResultSet) -> String {
    let rows_json = serde_json::to_string_pretty(rows).unwrap_or_else(|_| "[]".to_string());
    format!("User question:\n{question}\n\nSQL executed:\n{query}\n\nResult rows (JSON):\n{rows_json}")
}
