//! health-ask - Plain-language questions over a PostgreSQL health dataset.
//!
//! A question goes to a language model for SQL, the SQL passes a lexical
//! safety gate, runs read-only, and the rows are narrated back in prose.

pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod llm;
pub mod logging;
pub mod pipeline;
pub mod safety;
