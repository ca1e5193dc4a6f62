//! The Graph Walker (C6).
//!
//! Three pure, allocation-light operations over a parsed [`Workflow`]. Because successors
//! are embedded node values rather than cross-referenced by id, every operation here is a
//! DFS from the trigger — there is no separate adjacency structure to keep in sync.

use workflow_types::{Node, Workflow};

/// The shape of a node's successor slots, independent of its specific variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeShape {
    /// The root; has a single `child` slot and no parents.
    Trigger,
    /// A single `child` slot: FixedInput, Tool, Converter, UpsertState, Skip.
    RegularSingleChild,
    /// `trueChild`/`falseChild` slots, selected by a boolean handler result.
    BooleanTwoChild,
    /// A `children` list, selected by a handler-returned identifier.
    ConditionManyChild,
}

/// Classifies a node by its successor shape.
pub fn classify(node: &Node) -> NodeShape {
    match node {
        Node::CronjobTrigger(_) => NodeShape::Trigger,
        Node::FixedInput(_) | Node::Tool(_) | Node::Converter(_) | Node::UpsertState(_) | Node::Skip(_) => NodeShape::RegularSingleChild,
        Node::Boolean(_) => NodeShape::BooleanTwoChild,
        Node::Condition(_) => NodeShape::ConditionManyChild,
    }
}

/// Finds the node with the given identifier via DFS from the trigger.
pub fn find_by_id<'a>(workflow: &'a Workflow, id: &str) -> Option<&'a Node> {
    find_in(&workflow.trigger, id)
}

fn find_in<'a>(node: &'a Node, id: &str) -> Option<&'a Node> {
    if node.identifier() == id {
        return Some(node);
    }

    for child in successors(node) {
        if let Some(found) = find_in(child, id) {
            return Some(found);
        }
    }
    None
}

/// Collects every node whose successor slot names `id`, in DFS-from-trigger order.
///
/// This intentionally counts *any* node's successor slot, including the trigger's —
/// a regular node reached directly off the trigger's `child` slot has the trigger itself
/// as a parent. Callers that need to treat the trigger as already-satisfied (the
/// scheduler's join-wait logic) filter it out themselves.
pub fn parents_of<'a>(workflow: &'a Workflow, id: &str) -> Vec<&'a Node> {
    let mut parents = Vec::new();
    collect_parents(&workflow.trigger, id, &mut parents);
    parents
}

fn collect_parents<'a>(node: &'a Node, id: &str, parents: &mut Vec<&'a Node>) {
    if successors(node).iter().any(|child| child.identifier() == id) {
        parents.push(node);
    }

    for child in successors(node) {
        collect_parents(child, id, parents);
    }
}

/// Returns every embedded successor of `node`, in authoring order.
fn successors(node: &Node) -> Vec<&Node> {
    match node {
        Node::CronjobTrigger(n) => n.child.as_deref().into_iter().collect(),
        Node::FixedInput(n) => n.child.as_deref().into_iter().collect(),
        Node::Tool(n) => n.child.as_deref().into_iter().collect(),
        Node::Converter(n) => n.child.as_deref().into_iter().collect(),
        Node::UpsertState(n) => n.child.as_deref().into_iter().collect(),
        Node::Skip(n) => n.child.as_deref().into_iter().collect(),
        Node::Boolean(n) => n.true_child.as_deref().into_iter().chain(n.false_child.as_deref()).collect(),
        Node::Condition(n) => n.children.iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use workflow_types::parse;

    fn sample_workflow() -> Workflow {
        let doc = json!({
            "title": "t",
            "trigger": {
                "type": "CronjobTrigger",
                "identifier": "trigger",
                "cron": "* * * * *",
                "child": {
                    "type": "Boolean",
                    "identifier": "gate",
                    "code": "async function handle() { return true }",
                    "trueChild": {"type": "Skip", "identifier": "yes"},
                    "falseChild": {"type": "Skip", "identifier": "no"}
                }
            }
        });
        parse(&doc).expect("parse")
    }

    #[test]
    fn find_by_id_locates_nested_node() {
        let workflow = sample_workflow();
        assert!(find_by_id(&workflow, "yes").is_some());
        assert!(find_by_id(&workflow, "missing").is_none());
    }

    #[test]
    fn parents_of_includes_trigger_for_direct_child() {
        let workflow = sample_workflow();
        let parents = parents_of(&workflow, "gate");
        assert_eq!(parents.len(), 1);
        assert_eq!(parents[0].identifier(), "trigger");
    }

    #[test]
    fn parents_of_finds_boolean_parent() {
        let workflow = sample_workflow();
        let parents = parents_of(&workflow, "yes");
        assert_eq!(parents.len(), 1);
        assert_eq!(parents[0].identifier(), "gate");
    }

    #[test]
    fn classify_matches_node_shape() {
        let workflow = sample_workflow();
        assert_eq!(classify(&workflow.trigger), NodeShape::Trigger);
        let gate = find_by_id(&workflow, "gate").unwrap();
        assert_eq!(classify(gate), NodeShape::BooleanTwoChild);
        let yes = find_by_id(&workflow, "yes").unwrap();
        assert_eq!(classify(yes), NodeShape::RegularSingleChild);
    }
}
