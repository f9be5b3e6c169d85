//! health-ask - Plain-language questions over a PostgreSQL health dataset.

use std::process::ExitCode;
use std::sync::Arc;

use health_ask::cli::Cli;
use health_ask::config::Config;
use health_ask::db::{self, DatabaseClient, MockDatabaseClient, SchemaDescriptor};
use health_ask::error::{AskError, ErrorBody, Result};
use health_ask::llm::create_client;
use health_ask::logging;
use health_ask::pipeline::{Pipeline, PipelineComponents, PipelineConfig};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    // .env is optional; real environment variables win over it
    let _ = dotenvy::dotenv();

    let cli = Cli::parse_args();

    if cli.log_file {
        logging::init_file_logging();
    } else {
        logging::init_stderr_logging();
    }

    match run(&cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{}: {}", e.category(), e);
            print_json(&ErrorBody::from(&e), cli.pretty);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> Result<ExitCode> {
    let config = load_config(cli)?;
    let schema = Arc::new(SchemaDescriptor::health());

    if cli.print_schema {
        println!("{}", schema.format_for_llm());
        return Ok(ExitCode::SUCCESS);
    }

    let llm = create_client(&config.llm)?;
    let db: Arc<dyn DatabaseClient> = if cli.mock_db {
        info!("Using mock database");
        Arc::new(MockDatabaseClient::new())
    } else {
        info!("Connecting to {}", config.database.display_string());
        Arc::from(db::connect(&config.database).await?)
    };

    let pipeline = Arc::new(Pipeline::new(PipelineComponents {
        llm,
        db: db.clone(),
        schema,
        config: PipelineConfig::from(&config),
    }));

    let all_ok = match cli.question() {
        Some(question) => answer(&pipeline, question, cli.pretty).await,
        None => answer_stdin(&pipeline, cli.pretty).await?,
    };

    if let Err(e) = db.close().await {
        warn!("Failed to close database connection: {}", e);
    }

    Ok(if all_ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Builds the configuration with precedence:
/// 1. CLI arguments (highest)
/// 2. Environment variables (including `.env`)
/// 3. Config file
/// 4. Built-in defaults
fn load_config(cli: &Cli) -> Result<Config> {
    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());

    let mut config = Config::load_from_file(&config_path)?;
    config.apply_env();
    cli.apply_to(&mut config)?;
    Ok(config)
}

/// Answers one question and prints the outcome or the error body.
async fn answer(pipeline: &Arc<Pipeline>, question: &str, pretty: bool) -> bool {
    match pipeline
        .clone()
        .handle_query_isolated(question.to_string())
        .await
    {
        Ok(outcome) => {
            print_json(&outcome, pretty);
            true
        }
        Err(e) => {
            log_failure(&e);
            print_json(&ErrorBody::from(&e), pretty);
            false
        }
    }
}

/// Answers each non-blank stdin line as an independent request.
async fn answer_stdin(pipeline: &Arc<Pipeline>, pretty: bool) -> Result<bool> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut all_ok = true;

    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| AskError::internal(format!("Failed to read stdin: {e}")))?
    {
        if line.trim().is_empty() {
            continue;
        }
        all_ok &= answer(pipeline, &line, pretty).await;
    }

    Ok(all_ok)
}

fn log_failure(e: &AskError) {
    match e {
        AskError::NoDataFound => info!("{}", e),
        AskError::SqlGeneration(_) => warn!("{}", e),
        _ => error!("{}: {}", e.category(), e),
    }
}

fn print_json<T: Serialize>(value: &T, pretty: bool) {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    match rendered {
        Ok(json) => println!("{json}"),
        Err(e) => error!("Failed to serialize output: {}", e),
    }
}
