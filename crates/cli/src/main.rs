//! Command-line entry point wiring the workflow engine to concrete collaborators.
//!
//! Two subcommands: `validate` structurally parses a workflow document without running
//! it, and `run` executes one. By default `run` uses in-memory test doubles for state and
//! tools (so the CLI is safe to use against hand-authored fixtures without a live
//! backend); pass `--live` to wire the production HTTP-backed collaborators instead.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use workflow_engine::{EngineConfig, EngineError, WorkflowEngine};
use workflow_js::BoaJsHandlerRunner;
use workflow_state::{DurableStateClient, TestStateClient};
use workflow_tools::{RealToolRunner, TestToolMode, TestToolRunner};
use workflow_types::parse;

#[derive(Parser)]
#[command(name = "workflow-cli", about = "Runs and validates workflow execution engine documents")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Structurally parses a workflow document without executing it.
    Validate {
        /// Path to the workflow JSON document.
        #[arg(long)]
        file: PathBuf,
    },
    /// Executes a workflow document once.
    Run {
        /// Path to the workflow JSON document.
        #[arg(long)]
        file: PathBuf,
        /// The workflow invocation context, as a JSON object. Defaults to `{}`.
        #[arg(long)]
        context: Option<String>,
        /// Initial state, as a JSON object. Only meaningful without `--live`.
        #[arg(long)]
        state: Option<String>,
        /// Wire the production HTTP-backed state client and tool runner instead of the
        /// in-memory test doubles. Reads `STATE_BASE_URL`, `STATE_API_KEY`,
        /// `TOOL_BASE_URL`, and `TOOL_API_KEY` from the environment.
        #[arg(long)]
        live: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    match cli.command {
        Command::Validate { file } => validate(&file),
        Command::Run { file, context, state, live } => run(&file, context, state, live).await,
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn validate(file: &PathBuf) -> anyhow::Result<()> {
    let document = read_json(file)?;
    match parse(&document) {
        Ok(workflow) => {
            info!(title = %workflow.title, "workflow is structurally valid");
            println!("valid: \"{}\"", workflow.title);
            Ok(())
        }
        Err(err) => {
            error!(%err, "workflow failed to parse");
            anyhow::bail!("invalid workflow: {err}")
        }
    }
}

async fn run(file: &PathBuf, context: Option<String>, state: Option<String>, live: bool) -> anyhow::Result<()> {
    let document = read_json(file)?;
    let workflow = parse(&document)?;

    let invocation_context = match context {
        Some(raw) => serde_json::from_str(&raw)?,
        None => Value::Object(Default::default()),
    };

    let js_runner = Arc::new(BoaJsHandlerRunner::default());

    let engine = if live {
        let state_base_url = std::env::var("STATE_BASE_URL").map_err(|_| anyhow::anyhow!("STATE_BASE_URL must be set for --live"))?;
        let state_api_key = std::env::var("STATE_API_KEY").map_err(|_| anyhow::anyhow!("STATE_API_KEY must be set for --live"))?;
        let tool_base_url = std::env::var("TOOL_BASE_URL").map_err(|_| anyhow::anyhow!("TOOL_BASE_URL must be set for --live"))?;
        let tool_api_key = std::env::var("TOOL_API_KEY").map_err(|_| anyhow::anyhow!("TOOL_API_KEY must be set for --live"))?;

        let state_client = Arc::new(DurableStateClient::new(state_base_url, state_api_key, workflow.title.clone()));
        let tool_runner = Arc::new(RealToolRunner::new(tool_base_url, tool_api_key));
        WorkflowEngine::new(js_runner, tool_runner, state_client, EngineConfig::default())
    } else {
        let initial_state: HashMap<String, Value> = match state {
            Some(raw) => serde_json::from_str(&raw)?,
            None => HashMap::new(),
        };
        let state_client = Arc::new(TestStateClient::seeded(initial_state));
        let tool_runner = Arc::new(TestToolRunner::new(Arc::new(|_tool_id: &str, _input: &Value, output_schema: &Value| TestToolMode::Test {
            result: Some(workflow_util::synthesize(output_schema)),
        })));
        WorkflowEngine::new(js_runner, tool_runner, state_client, EngineConfig::default())
    };

    match engine.execute(&workflow, invocation_context).await {
        Ok(output) => {
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
        Err(err) => {
            error!(%err, "workflow run failed");
            Err(describe_engine_error(err))
        }
    }
}

fn describe_engine_error(err: EngineError) -> anyhow::Error {
    match err {
        EngineError::Reference(reference) => anyhow::anyhow!("reference error: {reference}"),
        EngineError::Engine(engine) => anyhow::anyhow!("engine error: {engine}"),
    }
}

fn read_json(file: &PathBuf) -> anyhow::Result<Value> {
    let raw = std::fs::read_to_string(file).map_err(|err| anyhow::anyhow!("failed to read '{}': {err}", file.display()))?;
    serde_json::from_str(&raw).map_err(|err| anyhow::anyhow!("'{}' is not valid JSON: {err}", file.display()))
}
