//! The Scheduler & Executor (C7).
//!
//! Runs a single invocation of a parsed [`Workflow`] to completion: a FIFO queue of
//! `{node_id, context}` entries, dispatched one at a time through the Template Renderer,
//! JS Handler Runner, and Tool Runner, reading/writing state through the State Client.
//! Single-threaded and cooperative — node execution never overlaps within one `execute`
//! call, though a single [`WorkflowEngine`] instance may be reused across sequential runs
//! (its per-run state lives on the stack of `execute`, not on `self`).

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, warn};

use workflow_types::{parse_boolean_result, parse_condition_result, Node, Workflow};

use crate::error::EngineError;
use crate::graph::{classify, find_by_id, parents_of, NodeShape};
use crate::js::{HandlerContext, HandlerMeta, JsHandlerRunner};
use crate::state::StateClient;
use crate::template::{render, RenderContext};
use crate::tools::ToolRunner;

/// Construction-time options for a [`WorkflowEngine`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Mirrors the specification's `strictUndefinedInTemplates` option. Defaults to
    /// `true`; production callers never set this to `false`.
    pub strict_undefined_in_templates: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            strict_undefined_in_templates: true,
        }
    }
}

/// A pending execution: a node identifier plus the context it should receive. `None`
/// mirrors the specification's "undefined" context (used for the trigger's first enqueue
/// and for every Boolean/Condition successor, whose real input comes from the
/// single-parent read rule instead).
#[derive(Debug, Clone)]
struct QueueEntry {
    node_id: String,
    context: Option<Value>,
}

/// Owns the three pluggable collaborators and runs workflows against them.
///
/// A single instance is not safe for concurrent `execute` calls against overlapping
/// workflows sharing state — not because of any shared mutable field on `self` (there are
/// none; all per-run bookkeeping is local to `execute`), but because the collaborators
/// themselves (in particular the state client) are shared resources.
pub struct WorkflowEngine {
    js_runner: Arc<dyn JsHandlerRunner>,
    tool_runner: Arc<dyn ToolRunner>,
    state_client: Arc<dyn StateClient>,
    config: EngineConfig,
}

impl WorkflowEngine {
    pub fn new(js_runner: Arc<dyn JsHandlerRunner>, tool_runner: Arc<dyn ToolRunner>, state_client: Arc<dyn StateClient>, config: EngineConfig) -> Self {
        Self {
            js_runner,
            tool_runner,
            state_client,
            config,
        }
    }

    /// Runs `workflow` once against `invocation_context`, returning the output of the
    /// last node executed.
    pub async fn execute(&self, workflow: &Workflow, invocation_context: Value) -> Result<Value, EngineError> {
        let trigger = workflow.trigger_node();
        let Some(first_child) = trigger.child.as_deref() else {
            return Err(EngineError::new(format!("trigger '{}' has no child; nothing to execute", trigger.identifier)));
        };

        let mut run = RunState::default();
        run.queue.push_back(QueueEntry {
            node_id: first_child.identifier().to_string(),
            context: None,
        });

        while let Some(entry) = run.queue.pop_front() {
            if run.executed.contains(&entry.node_id) {
                continue;
            }

            let node = find_by_id(workflow, &entry.node_id)
                .ok_or_else(|| EngineError::new(format!("unreachable node identifier '{}'", entry.node_id)))?;

            if matches!(classify(node), NodeShape::BooleanTwoChild | NodeShape::ConditionManyChild)
                && !self.join_ready(workflow, node, &mut run, entry.clone())?
            {
                continue;
            }

            let output = self.execute_node(workflow, node, entry.context.clone(), &invocation_context, &run).await?;

            run.executed.insert(entry.node_id.clone());
            run.outputs.insert(entry.node_id.clone(), output.clone());
            run.last_output = output.clone();

            self.queue_next(workflow, node, &output, &mut run)?;
        }

        Ok(run.last_output)
    }

    /// Implements the join-wait rule for Boolean/Condition nodes. Returns `Ok(true)` once
    /// every non-trigger parent has arrived (execution should proceed this iteration);
    /// `Ok(false)` after re-queueing; `Err` once the re-queue bound is exceeded.
    fn join_ready(&self, workflow: &Workflow, node: &Node, run: &mut RunState, entry: QueueEntry) -> Result<bool, EngineError> {
        let id = node.identifier();
        let all_parents = parents_of(workflow, id);
        let non_trigger_parent_count = all_parents.iter().filter(|p| !matches!(p, Node::CronjobTrigger(_))).count();

        let arrived = run.parent_arrivals.entry(id.to_string()).or_default();
        for parent in &all_parents {
            if matches!(parent, Node::CronjobTrigger(_)) || run.executed.contains(parent.identifier()) {
                arrived.insert(parent.identifier().to_string());
            }
        }

        if arrived.len() < all_parents.len() {
            let bound = non_trigger_parent_count.max(1);
            let attempts = run.requeue_counts.entry(id.to_string()).or_insert(0);
            *attempts += 1;
            if *attempts > bound {
                return Err(EngineError::new(format!("deadlocked conditional '{id}'")));
            }
            debug!(node_id = id, attempts, bound, "re-queueing join node pending parent arrival");
            run.queue.push_back(entry);
            return Ok(false);
        }

        Ok(true)
    }

    /// Dispatches a single node to its handler per §4.7's per-type execution rules.
    async fn execute_node(&self, workflow: &Workflow, node: &Node, context: Option<Value>, invocation_context: &Value, run: &RunState) -> Result<Value, EngineError> {
        match node {
            Node::CronjobTrigger(_) => Ok(context.unwrap_or_else(|| json!({"trigger": "executed", "timestamp": chrono::Utc::now().to_rfc3339()}))),

            Node::FixedInput(n) => {
                let input_context = context.unwrap_or_else(|| invocation_context.clone());
                let state = self.snapshot_state().await.map_err(|cause| EngineError::wrap(format!("FixedInput node '{}' execution failed", n.identifier), cause))?;
                let mut render_ctx = RenderContext::new(input_context, invocation_context.clone(), state);
                render_ctx.strict = self.config.strict_undefined_in_templates;

                render(&n.output, &render_ctx, &n.identifier).map_err(|err| match err {
                    crate::template::TemplateError::Reference(reference) => EngineError::Reference(reference),
                    crate::template::TemplateError::Render(render_err) => EngineError::wrap(format!("FixedInput node '{}' execution failed", n.identifier), render_err),
                })
            }

            Node::Tool(n) => {
                let input = context.unwrap_or(Value::Null);
                self.tool_runner
                    .execute(&n.tool_identifier, &input, &n.input_schema, &n.output_schema)
                    .await
                    .map_err(|cause| EngineError::wrap(format!("Tool node '{}' execution failed", n.identifier), cause))
            }

            Node::Converter(n) => {
                let state = self.snapshot_state().await.map_err(|cause| EngineError::wrap(format!("Converter node '{}' execution failed", n.identifier), cause))?;
                let handler_ctx = HandlerContext {
                    input: context.unwrap_or(Value::Null),
                    state,
                };
                let meta = HandlerMeta {
                    node_id: n.identifier.clone(),
                    node_type: "Converter",
                };
                self.js_runner
                    .execute(handler_ctx, &n.code, meta)
                    .await
                    .map_err(|cause| EngineError::wrap(format!("Converter node '{}' execution failed", n.identifier), cause))
            }

            Node::Condition(n) => {
                let parent_input = self.single_parent_input(workflow, &n.identifier, run);
                let state = self.snapshot_state().await.map_err(|cause| EngineError::wrap(format!("Condition node '{}' execution failed", n.identifier), cause))?;
                let handler_ctx = HandlerContext { input: parent_input, state };
                let meta = HandlerMeta {
                    node_id: n.identifier.clone(),
                    node_type: "Condition",
                };
                let result = self
                    .js_runner
                    .execute(handler_ctx, &n.code, meta)
                    .await
                    .map_err(|cause| EngineError::wrap(format!("Condition node '{}' execution failed", n.identifier), cause))?;

                let parsed = parse_condition_result(&result).map_err(|cause| EngineError::wrap(format!("Condition node '{}' execution failed", n.identifier), cause))?;
                Ok(match parsed {
                    Some(next_id) => Value::String(next_id),
                    None => Value::Null,
                })
            }

            Node::Boolean(n) => {
                let parent_input = self.single_parent_input(workflow, &n.identifier, run);
                let state = self.snapshot_state().await.map_err(|cause| EngineError::wrap(format!("Boolean node '{}' execution failed", n.identifier), cause))?;
                let handler_ctx = HandlerContext { input: parent_input, state };
                let meta = HandlerMeta {
                    node_id: n.identifier.clone(),
                    node_type: "Boolean",
                };
                let result = self
                    .js_runner
                    .execute(handler_ctx, &n.code, meta)
                    .await
                    .map_err(|cause| EngineError::wrap(format!("Boolean node '{}' execution failed", n.identifier), cause))?;

                let parsed = parse_boolean_result(&result).map_err(|cause| EngineError::wrap(format!("Boolean node '{}' execution failed", n.identifier), cause))?;
                Ok(Value::Bool(parsed))
            }

            Node::UpsertState(n) => {
                self.state_client
                    .set_state(&n.key, n.value.clone())
                    .await
                    .map_err(|cause| EngineError::wrap(format!("UpsertState node '{}' execution failed", n.identifier), cause))?;
                Ok(n.value.clone())
            }

            Node::Skip(_) => Ok(context.unwrap_or(Value::Null)),
        }
    }

    /// The single-parent read rule (P5): a Boolean/Condition handler's `input` is the
    /// output of the first non-trigger parent returned by `parentsOf`, or `null` if none
    /// exists.
    fn single_parent_input(&self, workflow: &Workflow, node_id: &str, run: &RunState) -> Value {
        parents_of(workflow, node_id)
            .into_iter()
            .find(|parent| !matches!(parent, Node::CronjobTrigger(_)))
            .and_then(|parent| run.outputs.get(parent.identifier()))
            .cloned()
            .unwrap_or(Value::Null)
    }

    async fn snapshot_state(&self) -> anyhow::Result<HashMap<String, Value>> {
        Ok(self.state_client.get_all_state().await?)
    }

    /// Enqueues this node's successor(s) per §4.7's "Queue next" rules.
    fn queue_next(&self, workflow: &Workflow, node: &Node, output: &Value, run: &mut RunState) -> Result<(), EngineError> {
        match node {
            Node::Skip(_) => {}

            Node::CronjobTrigger(n) => enqueue_regular(run, n.child.as_deref(), output),
            Node::FixedInput(n) => enqueue_regular(run, n.child.as_deref(), output),
            Node::Tool(n) => enqueue_regular(run, n.child.as_deref(), output),
            Node::Converter(n) => enqueue_regular(run, n.child.as_deref(), output),
            Node::UpsertState(n) => enqueue_regular(run, n.child.as_deref(), output),

            Node::Boolean(n) => {
                let chosen = if output.as_bool().unwrap_or(false) { n.true_child.as_deref() } else { n.false_child.as_deref() };
                match chosen {
                    Some(child) => run.queue.push_back(QueueEntry {
                        node_id: child.identifier().to_string(),
                        context: None,
                    }),
                    None => warn!(node_id = %n.identifier, "Boolean node has no child for the chosen branch; terminating"),
                }
            }

            Node::Condition(n) => {
                if let Value::String(next_id) = output {
                    if !n.children.iter().any(|child| child.identifier() == next_id) {
                        return Err(EngineError::new(format!("Condition node '{}' returned unknown child identifier '{next_id}'", n.identifier)));
                    }
                    run.queue.push_back(QueueEntry {
                        node_id: next_id.clone(),
                        context: None,
                    });
                }
            }
        }

        let _ = workflow;
        Ok(())
    }
}

fn enqueue_regular(run: &mut RunState, child: Option<&Node>, output: &Value) {
    if let Some(child) = child {
        run.queue.push_back(QueueEntry {
            node_id: child.identifier().to_string(),
            context: Some(output.clone()),
        });
    }
}

#[derive(Default)]
struct RunState {
    queue: VecDeque<QueueEntry>,
    executed: HashSet<String>,
    outputs: HashMap<String, Value>,
    parent_arrivals: HashMap<String, HashSet<String>>,
    requeue_counts: HashMap<String, usize>,
    last_output: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use workflow_state::TestStateClient;
    use workflow_tools::{TestToolMode, TestToolRunner};
    use workflow_types::parse;

    /// A [`JsHandlerRunner`] double keyed by node identifier rather than actually
    /// interpreting `source` — lets scheduler-level tests exercise Condition/Boolean
    /// dispatch without pulling in `workflow-js`'s `boa_engine` sandbox.
    struct ScriptedJsRunner {
        responses: HashMap<String, Value>,
    }

    #[async_trait::async_trait]
    impl JsHandlerRunner for ScriptedJsRunner {
        async fn execute(&self, _ctx: HandlerContext, _source: &str, meta: HandlerMeta) -> Result<Value, crate::js::HandlerError> {
            self.responses
                .get(&meta.node_id)
                .cloned()
                .ok_or_else(|| crate::js::HandlerError::Thrown(format!("no scripted response for node '{}'", meta.node_id)))
        }
    }

    fn test_engine(responses: HashMap<String, Value>) -> WorkflowEngine {
        let js_runner = Arc::new(ScriptedJsRunner { responses });
        let tool_runner = Arc::new(TestToolRunner::new(Arc::new(|_, _, _| TestToolMode::Test { result: Some(Value::Null) })));
        let state_client = Arc::new(TestStateClient::new());
        WorkflowEngine::new(js_runner, tool_runner, state_client, EngineConfig::default())
    }

    fn condition_workflow() -> Value {
        serde_json::json!({
            "title": "condition dispatch",
            "trigger": {
                "type": "CronjobTrigger",
                "identifier": "trigger",
                "cron": "* * * * *",
                "child": {
                    "type": "Condition",
                    "identifier": "cond",
                    "code": "async function handle() {}",
                    "children": [
                        {"type": "Skip", "identifier": "branch-a"},
                        {"type": "Skip", "identifier": "branch-b"}
                    ]
                }
            }
        })
    }

    #[tokio::test]
    async fn condition_enqueues_the_returned_child_identifier() {
        let mut responses = HashMap::new();
        responses.insert("cond".to_string(), Value::String("branch-b".to_string()));
        let engine = test_engine(responses);
        let workflow = parse(&condition_workflow()).expect("parse");

        let output = engine.execute(&workflow, Value::Null).await.expect("run succeeds");
        assert_eq!(output, Value::Null, "branch-b is a Skip with no forwarded context");
    }

    #[tokio::test]
    async fn condition_null_terminates_without_error() {
        let mut responses = HashMap::new();
        responses.insert("cond".to_string(), Value::Null);
        let engine = test_engine(responses);
        let workflow = parse(&condition_workflow()).expect("parse");

        let output = engine.execute(&workflow, Value::Null).await.expect("run succeeds");
        assert_eq!(output, Value::Null, "the Condition node's own null output is the last recorded output");
    }

    #[tokio::test]
    async fn condition_unknown_identifier_fails_the_run() {
        let mut responses = HashMap::new();
        responses.insert("cond".to_string(), Value::String("not-a-real-child".to_string()));
        let engine = test_engine(responses);
        let workflow = parse(&condition_workflow()).expect("parse");

        let err = engine.execute(&workflow, Value::Null).await.unwrap_err();
        match err {
            EngineError::Engine(inner) => assert!(inner.message.contains("unknown child identifier")),
            other => panic!("expected a WorkflowEngineError, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn trigger_without_child_fails_immediately() {
        let engine = test_engine(HashMap::new());
        let workflow = parse(&serde_json::json!({
            "title": "empty",
            "trigger": {"type": "CronjobTrigger", "identifier": "trigger", "cron": "* * * * *"}
        }))
        .expect("parse");

        let err = engine.execute(&workflow, Value::Null).await.unwrap_err();
        match err {
            EngineError::Engine(inner) => assert!(inner.message.contains("has no child")),
            other => panic!("expected a WorkflowEngineError, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn boolean_missing_branch_terminates_implicitly_instead_of_failing() {
        let workflow = parse(&serde_json::json!({
            "title": "boolean missing branch",
            "trigger": {
                "type": "CronjobTrigger",
                "identifier": "trigger",
                "cron": "* * * * *",
                "child": {
                    "type": "Boolean",
                    "identifier": "gate",
                    "code": "async function handle() { return false; }",
                    "trueChild": {"type": "Skip", "identifier": "yes"}
                }
            }
        }))
        .expect("parse");

        let mut responses = HashMap::new();
        responses.insert("gate".to_string(), Value::Bool(false));
        let engine = test_engine(responses);

        let output = engine.execute(&workflow, Value::Null).await.expect("run completes without error");
        assert_eq!(output, Value::Bool(false), "the Boolean node's own output is last since no falseChild exists");
    }
}
