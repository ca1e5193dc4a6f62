//! Tagged-variant definition of the workflow node tree.
//!
//! Every node variant owns its successor fields explicitly rather than relying on
//! inheritance or a shared base type: the scheduler dispatches on the `Node` tag and
//! each arm knows exactly which fields it carries. Successors are embedded node values
//! (not cross-referenced by id), so cycles are structurally impossible — `Option<Box<Node>>`
//! for single-successor slots and `Vec<Node>` for `Condition::children` are both just the
//! indirection the recursive type needs, not an adjacency list.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single node in a workflow graph.
///
/// The `type` discriminator selects the variant; unknown discriminators are rejected by
/// serde before [`crate::parse`] ever sees a [`Workflow`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Node {
    CronjobTrigger(CronjobTriggerNode),
    FixedInput(FixedInputNode),
    Tool(ToolNode),
    Converter(ConverterNode),
    Condition(ConditionNode),
    Boolean(BooleanNode),
    UpsertState(UpsertStateNode),
    Skip(SkipNode),
}

impl Node {
    /// Returns the node's unique identifier, regardless of variant.
    pub fn identifier(&self) -> &str {
        match self {
            Node::CronjobTrigger(n) => &n.identifier,
            Node::FixedInput(n) => &n.identifier,
            Node::Tool(n) => &n.identifier,
            Node::Converter(n) => &n.identifier,
            Node::Condition(n) => &n.identifier,
            Node::Boolean(n) => &n.identifier,
            Node::UpsertState(n) => &n.identifier,
            Node::Skip(n) => &n.identifier,
        }
    }

    /// Returns a short, human-readable type name for error messages (e.g. `"Tool"`).
    pub fn type_name(&self) -> &'static str {
        match self {
            Node::CronjobTrigger(_) => "CronjobTrigger",
            Node::FixedInput(_) => "FixedInput",
            Node::Tool(_) => "Tool",
            Node::Converter(_) => "Converter",
            Node::Condition(_) => "Condition",
            Node::Boolean(_) => "Boolean",
            Node::UpsertState(_) => "UpsertState",
            Node::Skip(_) => "Skip",
        }
    }
}

/// The workflow root. `cron` is metadata for an external scheduler; the engine treats it
/// as opaque and never inspects it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CronjobTriggerNode {
    pub identifier: String,
    pub cron: String,
    #[serde(default)]
    pub child: Option<Box<Node>>,
}

/// Emits a literal JSON value, recursively templated against `{input, context, state}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FixedInputNode {
    pub identifier: String,
    pub output: Value,
    #[serde(default)]
    pub child: Option<Box<Node>>,
}

/// Invokes a remote tool by identifier, validating input/output against JSON Schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ToolNode {
    pub identifier: String,
    pub tool_identifier: String,
    pub input_schema: Value,
    pub output_schema: Value,
    #[serde(default)]
    pub child: Option<Box<Node>>,
}

/// Runs a user-authored handler (`async function handle(ctx)`) and forwards its return
/// value unchanged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConverterNode {
    pub identifier: String,
    pub code: String,
    /// Fixed to a JS/TS-flavored runtime; carried for authoring tooling, unused by the
    /// executor itself.
    #[serde(default = "default_runtime")]
    pub runtime: String,
    #[serde(default)]
    pub child: Option<Box<Node>>,
}

/// A join point whose handler selects exactly one of `children` by identifier, or `null`
/// to terminate the run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConditionNode {
    pub identifier: String,
    pub code: String,
    #[serde(default = "default_runtime")]
    pub runtime: String,
    #[serde(default)]
    pub children: Vec<Node>,
}

/// A join point whose handler's boolean result selects `trueChild` or `falseChild`;
/// an absent chosen slot terminates the run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BooleanNode {
    pub identifier: String,
    pub code: String,
    #[serde(default = "default_runtime")]
    pub runtime: String,
    #[serde(default)]
    pub true_child: Option<Box<Node>>,
    #[serde(default)]
    pub false_child: Option<Box<Node>>,
}

/// Writes a literal (untemplated) value to state under `key`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpsertStateNode {
    pub identifier: String,
    pub key: String,
    pub value: Value,
    #[serde(default)]
    pub child: Option<Box<Node>>,
}

/// The explicit terminator. Its `child`, if present in authored documents, is never
/// traversed by the executor — it terminates the run and yields its received input.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SkipNode {
    pub identifier: String,
    #[serde(default)]
    pub child: Option<Box<Node>>,
}

fn default_runtime() -> String {
    "javascript".to_string()
}

/// The root document: `{title, trigger}`. `trigger` is always a [`Node::CronjobTrigger`];
/// [`crate::parse::parse`] rejects documents whose trigger is any other variant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Workflow {
    pub title: String,
    pub trigger: Node,
}

impl Workflow {
    /// Returns the trigger's inner struct, assuming the invariant enforced by `parse`
    /// that `trigger` is always `Node::CronjobTrigger`.
    pub fn trigger_node(&self) -> &CronjobTriggerNode {
        match &self.trigger {
            Node::CronjobTrigger(n) => n,
            other => unreachable!("Workflow::trigger must be CronjobTrigger, found {}", other.type_name()),
        }
    }
}
