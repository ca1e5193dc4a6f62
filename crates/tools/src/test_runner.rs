//! The schema-driven test double for [`ToolRunner`].
//!
//! Every call is routed through a caller-supplied policy deciding, per invocation,
//! whether to delegate to a real runner or fabricate a result — and every call is
//! recorded, so end-to-end tests can assert "telegram-bot was called exactly once with
//! this chat id" without standing up a gateway.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use workflow_engine::{ToolError, ToolRunner};
use workflow_util::{synthesize, validate_input};

/// What the test runner should do for a single call, decided by the caller's policy.
pub enum TestToolMode {
    /// Delegate to the wrapped real runner.
    Real,
    /// Short-circuit with `result`, or synthesize one from the tool's output schema if
    /// `result` is `None`.
    Test { result: Option<Value> },
}

/// A policy deciding, per call, whether a tool invocation is real or faked.
pub type ToolPolicy = dyn Fn(&str, &Value, &Value) -> TestToolMode + Send + Sync;

#[derive(Default)]
struct CallLog {
    counts: HashMap<String, usize>,
    last_inputs: HashMap<String, Value>,
}

/// A policy-driven [`ToolRunner`] double.
///
/// Validates `input` against `input_schema` before consulting the policy — a validation
/// failure fails the node regardless of what the policy would have decided, matching the
/// specification's "validate before dispatch" ordering.
pub struct TestToolRunner {
    policy: Arc<ToolPolicy>,
    real_runner: Option<Arc<dyn ToolRunner>>,
    log: Mutex<CallLog>,
}

impl TestToolRunner {
    pub fn new(policy: Arc<ToolPolicy>) -> Self {
        Self {
            policy,
            real_runner: None,
            log: Mutex::new(CallLog::default()),
        }
    }

    pub fn with_real_runner(policy: Arc<ToolPolicy>, real_runner: Arc<dyn ToolRunner>) -> Self {
        Self {
            policy,
            real_runner: Some(real_runner),
            log: Mutex::new(CallLog::default()),
        }
    }

    /// The number of times `tool_identifier` has been called so far.
    pub fn call_count(&self, tool_identifier: &str) -> usize {
        self.log.lock().expect("tool call log mutex poisoned").counts.get(tool_identifier).copied().unwrap_or(0)
    }

    /// The most recent input passed to `tool_identifier`, if it has ever been called.
    pub fn last_input(&self, tool_identifier: &str) -> Option<Value> {
        self.log.lock().expect("tool call log mutex poisoned").last_inputs.get(tool_identifier).cloned()
    }
}

#[async_trait]
impl ToolRunner for TestToolRunner {
    async fn execute(&self, tool_identifier: &str, input: &Value, input_schema: &Value, output_schema: &Value) -> Result<Value, ToolError> {
        validate_input(input, input_schema).map_err(ToolError::Validation)?;

        {
            let mut log = self.log.lock().expect("tool call log mutex poisoned");
            *log.counts.entry(tool_identifier.to_string()).or_insert(0) += 1;
            log.last_inputs.insert(tool_identifier.to_string(), input.clone());
        }

        match (self.policy)(tool_identifier, input, output_schema) {
            TestToolMode::Real => {
                let real_runner = self
                    .real_runner
                    .as_ref()
                    .ok_or_else(|| ToolError::Invocation(format!("no real tool runner configured for '{tool_identifier}'")))?;
                real_runner.execute(tool_identifier, input, input_schema, output_schema).await
            }
            TestToolMode::Test { result: Some(result) } => Ok(result),
            TestToolMode::Test { result: None } => Ok(synthesize(output_schema)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> Value {
        json!({"type": "object", "required": ["chat_id"], "properties": {"chat_id": {"type": "string"}}})
    }

    #[tokio::test]
    async fn records_call_count_and_last_input() {
        let runner = TestToolRunner::new(Arc::new(|_, _, _| TestToolMode::Test { result: Some(json!({"result": "success"})) }));
        let input = json!({"chat_id": "123"});
        runner.execute("telegram-bot", &input, &schema(), &json!({"type": "object"})).await.unwrap();
        runner.execute("telegram-bot", &input, &schema(), &json!({"type": "object"})).await.unwrap();

        assert_eq!(runner.call_count("telegram-bot"), 2);
        assert_eq!(runner.last_input("telegram-bot"), Some(input));
    }

    #[tokio::test]
    async fn validation_failure_short_circuits_before_policy() {
        let runner = TestToolRunner::new(Arc::new(|_, _, _| panic!("policy must not run when validation fails")));
        let err = runner.execute("telegram-bot", &json!({}), &schema(), &json!({"type": "object"})).await.unwrap_err();
        assert!(matches!(err, ToolError::Validation(_)));
    }

    #[tokio::test]
    async fn null_result_synthesizes_from_output_schema() {
        let output_schema = json!({"type": "object", "required": ["price"], "properties": {"price": {"type": "number"}}});
        let runner = TestToolRunner::new(Arc::new(|_, _, _| TestToolMode::Test { result: None }));
        let result = runner.execute("binance", &json!({"symbol": "BTCUSDT"}), &json!({"type": "object"}), &output_schema).await.unwrap();
        assert!(result.get("price").is_some());
    }
}
