//! Logging configuration for health-ask.
//!
//! Logs go to stderr by default so stdout carries only JSON answers. With
//! `--log-file` they go to a file in the platform state directory instead.
//!
//! Every query that passes validation is logged at `info` under the
//! [`AUDIT_TARGET`] target (`health_ask::audit`), with the question and the
//! accepted SQL as fields. The filter comes from `RUST_LOG` and defaults to
//! `info`, so the audit trail is on unless filtered out. To keep only the
//! audit records, run with `RUST_LOG=health_ask::audit=info`. Rejected queries
//! are logged at `warn` under the crate's normal targets.

use std::fs::{self, File};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Target used for the accepted-SQL audit trail.
pub const AUDIT_TARGET: &str = "health_ask::audit";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initializes logging to a file.
///
/// Location: `~/.local/state/health-ask/health-ask.log` on Linux (XDG state
/// directory), or the platform-appropriate state/config directory elsewhere.
/// Falls back to stderr when the file cannot be created.
pub fn init_file_logging() {
    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            eprintln!("Warning: Could not create log directory: {e}");
            init_stderr_logging();
            return;
        }
    }

    // Truncate on each run to avoid unbounded growth
    let log_file = match File::create(&log_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: Could not create log file: {e}");
            init_stderr_logging();
            return;
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(log_file)
        .with_ansi(false)
        .init();
}

/// Initializes logging to stderr.
pub fn init_stderr_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .init();
}

/// Returns the path for the log file.
pub fn get_log_path() -> PathBuf {
    if let Some(state_dir) = dirs::state_dir() {
        return state_dir.join("health-ask").join("health-ask.log");
    }

    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("health-ask").join("health-ask.log");
    }

    std::env::temp_dir().join("health-ask.log")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_path_is_absolute() {
        assert!(get_log_path().is_absolute());
    }

    #[test]
    fn test_log_path_file_name() {
        assert!(get_log_path().ends_with("health-ask.log"));
    }

    #[test]
    fn test_audit_target_matches_crate_path() {
        assert!(AUDIT_TARGET.starts_with(env!("CARGO_CRATE_NAME")));
    }

    #[test]
    fn test_audit_only_filter_parses() {
        assert!(EnvFilter::try_new(format!("{AUDIT_TARGET}=info")).is_ok());
    }
}
