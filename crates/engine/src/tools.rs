//! The Tool Runner contract (C4).
//!
//! Invokes a remote tool by identifier. `workflow-tools` supplies the production HTTP
//! gateway client and a schema-driven test double; the engine only depends on the trait
//! below.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Failure invoking a tool.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("No output from tool")]
    NoOutput,

    #[error("Failed to execute tool: {0}")]
    Invocation(String),

    #[error("tool input validation failed:\n{}", .0.join("\n"))]
    Validation(Vec<String>),
}

/// Invokes a tool by identifier, validating its I/O against JSON Schema.
#[async_trait]
pub trait ToolRunner: Send + Sync {
    async fn execute(&self, tool_identifier: &str, input: &Value, input_schema: &Value, output_schema: &Value) -> Result<Value, ToolError>;
}
