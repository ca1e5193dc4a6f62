//! Structural parsing of untrusted workflow documents.
//!
//! Parsing once at ingress means the executor may assume well-formed nodes and spend its
//! attention on semantic failures (unresolved templates, handler errors, unknown join
//! targets) instead of re-checking shapes it already validated.

use std::collections::HashSet;

use serde_json::Value;
use thiserror::Error;

use crate::node::{Node, Workflow};

/// Failure parsing a workflow document.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The document did not match the expected `{title, trigger}` shape: an unknown
    /// node discriminator, a missing required field, or a field with the wrong type.
    #[error("invalid workflow document: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The document's `trigger` field was well-formed but was not a `CronjobTrigger`.
    #[error("workflow trigger must be a CronjobTrigger node, found '{found}'")]
    InvalidTrigger { found: String },

    /// The same node identifier appeared more than once in the graph.
    #[error("duplicate node identifier '{0}'")]
    DuplicateIdentifier(String),
}

/// Parses and structurally validates a workflow document.
///
/// Rejects unknown discriminators, missing required fields, wrong field types (all via
/// `serde`), a non-`CronjobTrigger` root, and duplicate node identifiers anywhere in the
/// tree.
pub fn parse(value: &Value) -> Result<Workflow, ParseError> {
    let workflow: Workflow = serde_json::from_value(value.clone())?;

    if !matches!(workflow.trigger, Node::CronjobTrigger(_)) {
        return Err(ParseError::InvalidTrigger {
            found: workflow.trigger.type_name().to_string(),
        });
    }

    let mut seen = HashSet::new();
    check_unique_identifiers(&workflow.trigger, &mut seen)?;

    Ok(workflow)
}

fn check_unique_identifiers(node: &Node, seen: &mut HashSet<String>) -> Result<(), ParseError> {
    if !seen.insert(node.identifier().to_string()) {
        return Err(ParseError::DuplicateIdentifier(node.identifier().to_string()));
    }

    match node {
        Node::CronjobTrigger(n) => visit_child(n.child.as_deref(), seen),
        Node::FixedInput(n) => visit_child(n.child.as_deref(), seen),
        Node::Tool(n) => visit_child(n.child.as_deref(), seen),
        Node::Converter(n) => visit_child(n.child.as_deref(), seen),
        Node::UpsertState(n) => visit_child(n.child.as_deref(), seen),
        Node::Skip(n) => visit_child(n.child.as_deref(), seen),
        Node::Boolean(n) => {
            visit_child(n.true_child.as_deref(), seen)?;
            visit_child(n.false_child.as_deref(), seen)
        }
        Node::Condition(n) => {
            for child in &n.children {
                check_unique_identifiers(child, seen)?;
            }
            Ok(())
        }
    }
}

fn visit_child(child: Option<&Node>, seen: &mut HashSet<String>) -> Result<(), ParseError> {
    match child {
        Some(node) => check_unique_identifiers(node, seen),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn skip(id: &str) -> Value {
        json!({"type": "Skip", "identifier": id})
    }

    #[test]
    fn parses_minimal_trigger_only_workflow() {
        let doc = json!({
            "title": "t",
            "trigger": {"type": "CronjobTrigger", "identifier": "trigger", "cron": "* * * * *", "child": skip("s1")}
        });
        let workflow = parse(&doc).expect("parse");
        assert_eq!(workflow.title, "t");
        assert_eq!(workflow.trigger_node().identifier, "trigger");
    }

    #[test]
    fn rejects_unknown_discriminator() {
        let doc = json!({
            "title": "t",
            "trigger": {"type": "Bogus", "identifier": "trigger"}
        });
        assert!(matches!(parse(&doc), Err(ParseError::Malformed(_))));
    }

    #[test]
    fn rejects_non_trigger_root() {
        let doc = json!({
            "title": "t",
            "trigger": {"type": "Skip", "identifier": "trigger"}
        });
        // `trigger` here deserializes fine as a Node, but must be a CronjobTrigger.
        let err = parse(&doc).unwrap_err();
        assert!(matches!(err, ParseError::InvalidTrigger { ref found } if found == "Skip"));
    }

    #[test]
    fn rejects_duplicate_identifiers() {
        let doc = json!({
            "title": "t",
            "trigger": {
                "type": "CronjobTrigger",
                "identifier": "trigger",
                "cron": "* * * * *",
                "child": {
                    "type": "Boolean",
                    "identifier": "dup",
                    "code": "async function handle() { return true }",
                    "trueChild": skip("dup"),
                    "falseChild": skip("s2")
                }
            }
        });
        assert!(matches!(parse(&doc), Err(ParseError::DuplicateIdentifier(id)) if id == "dup"));
    }

    #[test]
    fn missing_required_field_is_malformed() {
        let doc = json!({
            "title": "t",
            "trigger": {"type": "Tool", "identifier": "t1"}
        });
        assert!(matches!(parse(&doc), Err(ParseError::Malformed(_) | ParseError::InvalidTrigger { .. })));
    }
}
