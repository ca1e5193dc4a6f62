//! The `boa_engine`-backed [`JsHandlerRunner`].
//!
//! Each call gets a fresh [`Context`]: handler source is untrusted and per-invocation
//! isolation is cheaper to reason about than trying to safely reuse a context across
//! handlers that might leave globals mutated behind them.

use boa_engine::context::RuntimeLimits;
use boa_engine::{js_string, Context, JsValue, Source};
use serde_json::Value;
use tracing::debug;

use workflow_engine::{HandlerContext, HandlerError, HandlerMeta, JsHandlerRunner};

use crate::config::JsRunnerConfig;
use crate::http_bridge::{await_promise, register_axios};

const HANDLE_INVOCATION_SNIPPET: &str = "handle(__workflow_ctx)";

/// Runs `async function handle(ctx) { ... }` handler source inside a fresh `boa_engine`
/// sandbox per call, with an injected `axios`-shaped HTTP capability as the only I/O
/// surface.
#[derive(Debug, Clone)]
pub struct BoaJsHandlerRunner {
    config: JsRunnerConfig,
}

impl BoaJsHandlerRunner {
    pub fn new(config: JsRunnerConfig) -> Self {
        Self { config }
    }
}

impl Default for BoaJsHandlerRunner {
    fn default() -> Self {
        Self::new(JsRunnerConfig::default())
    }
}

#[async_trait::async_trait]
impl JsHandlerRunner for BoaJsHandlerRunner {
    async fn execute(&self, ctx: HandlerContext, source: &str, meta: HandlerMeta) -> Result<Value, HandlerError> {
        if source.len() > self.config.max_source_bytes {
            return Err(HandlerError::Compile(format!("handler source for node '{}' exceeds the {}-byte limit", meta.node_id, self.config.max_source_bytes)));
        }

        let ctx_json = serde_json::to_value(&ctx).map_err(|err| HandlerError::Compile(err.to_string()))?;
        let node_id = meta.node_id.clone();
        let node_type = meta.node_type;
        let config = self.config.clone();

        // All boa work is synchronous; no `.await` occurs between constructing and
        // dropping the `!Send` `Context`, so the surrounding async fn's generated future
        // stays `Send` even though nothing here is.
        run_handler(source, ctx_json, &node_id, node_type, &config)
    }
}

fn run_handler(source: &str, ctx_json: Value, node_id: &str, node_type: &'static str, config: &JsRunnerConfig) -> Result<Value, HandlerError> {
    let mut context = Context::default();
    context.set_runtime_limits(
        RuntimeLimits::default()
            .with_loop_iteration_limit(config.loop_iteration_limit)
            .with_recursion_limit(config.recursion_limit),
    );

    register_axios(&mut context).map_err(|err| HandlerError::Compile(err.to_string()))?;

    context
        .eval(Source::from_bytes(source))
        .map_err(|err| HandlerError::Compile(format!("{node_type} node '{node_id}': {err}")))?;

    let ctx_value = JsValue::from_json(&ctx_json, &mut context).map_err(|err| HandlerError::Compile(err.to_string()))?;
    context
        .global_object()
        .set(js_string!("__workflow_ctx"), ctx_value, false, &mut context)
        .map_err(|err| HandlerError::Compile(err.to_string()))?;

    debug!(%node_id, node_type, "invoking handler");

    let invocation = context
        .eval(Source::from_bytes(HANDLE_INVOCATION_SNIPPET))
        .map_err(|err| classify_runtime_error(node_type, node_id, &err))?;

    let settled = await_promise(invocation, &mut context).map_err(|err| classify_runtime_error(node_type, node_id, &err))?;

    settled.to_json(&mut context).map_err(|err| HandlerError::Thrown(err.to_string()))
}

fn classify_runtime_error(node_type: &'static str, node_id: &str, err: &boa_engine::JsError) -> HandlerError {
    let message = err.to_string();
    if message.contains("loop iteration limit") || message.contains("recursion limit") {
        HandlerError::Timeout
    } else {
        HandlerError::Thrown(format!("{node_type} node '{node_id}' threw: {message}"))
    }
}
