//! Integration tests for health-ask.

pub mod pipeline_test;
pub mod postgres_test;
