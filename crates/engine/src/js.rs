//! The JS Handler Runner contract (C3).
//!
//! User-authored handler source (`async function handle(ctx) { ... }`) runs inside a
//! sandbox with no ambient I/O beyond an injected `axios`-shaped HTTP capability. The
//! engine treats the runner as an opaque collaborator — see `workflow-js` for the
//! `boa_engine`-backed implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// The context object passed to a handler as its single argument: `handle(ctx)`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct HandlerContext {
    /// The parent node's output, or `Value::Null` for a root descendant.
    pub input: Value,
    /// A full state snapshot at the time this node was dispatched.
    pub state: HashMap<String, Value>,
}

/// Diagnostic-only metadata about the handler invocation. Never observed by handler code;
/// used by the runner for logging and error attribution.
#[derive(Debug, Clone)]
pub struct HandlerMeta {
    pub node_id: String,
    pub node_type: &'static str,
}

/// Failure compiling or running handler source.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("handler source failed to compile: {0}")]
    Compile(String),

    #[error("handler threw: {0}")]
    Thrown(String),

    #[error("handler execution timed out")]
    Timeout,
}

/// Sandboxed execution of user-supplied handler code.
#[async_trait]
pub trait JsHandlerRunner: Send + Sync {
    /// Compiles `source`, invokes `handle(ctx)`, and returns its (awaited) return value.
    async fn execute(&self, ctx: HandlerContext, source: &str, meta: HandlerMeta) -> Result<Value, HandlerError>;
}
