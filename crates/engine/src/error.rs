//! The engine's two-shape error surface.
//!
//! Every failure that can escape [`crate::scheduler::WorkflowEngine::execute`] is one of
//! exactly two variants: a [`WorkflowReferenceError`] (an unresolved template variable,
//! surfaced unchanged so callers can render it as a user-authored template bug) or a
//! [`WorkflowEngineError`] (everything else, wrapped with a node-identifying prefix).

use std::fmt;

use thiserror::Error;

/// Which render-context root an unresolved template path belonged to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceErrorKind {
    Input,
    Context,
}

impl fmt::Display for ReferenceErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceErrorKind::Input => write!(f, "input"),
            ReferenceErrorKind::Context => write!(f, "context"),
        }
    }
}

/// A template referenced an `input.*` or `context.*` path that was absent or null.
///
/// Propagates unchanged through the scheduler — never wrapped into a
/// [`WorkflowEngineError`] — so that callers can distinguish user-authored template bugs
/// from engine/infrastructure failures.
#[derive(Debug, Error)]
#[error("Field '{kind}.{path}' is undefined at node {node_id}")]
pub struct WorkflowReferenceError {
    pub kind: ReferenceErrorKind,
    pub path: String,
    pub node_id: String,
}

/// Every other engine failure: missing children, deadlocked joins, handler throws, tool
/// invocation failures, state backend errors. `cause`, when present, is the underlying
/// error that triggered this one.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct WorkflowEngineError {
    pub message: String,
    #[source]
    pub cause: Option<anyhow::Error>,
}

impl WorkflowEngineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            cause: None,
        }
    }

    pub fn wrap(message: impl Into<String>, cause: impl Into<anyhow::Error>) -> Self {
        let cause = cause.into();
        let message = format!("{}: {cause}", message.into());
        Self {
            message,
            cause: Some(cause),
        }
    }
}

/// The engine's full error surface: exactly the two shapes the specification allows to
/// escape `execute`.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Reference(#[from] WorkflowReferenceError),

    #[error(transparent)]
    Engine(#[from] WorkflowEngineError),
}

impl EngineError {
    pub fn wrap(message: impl Into<String>, cause: impl Into<anyhow::Error>) -> Self {
        EngineError::Engine(WorkflowEngineError::wrap(message, cause))
    }

    pub fn new(message: impl Into<String>) -> Self {
        EngineError::Engine(WorkflowEngineError::new(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_error_message_matches_contract() {
        let err = WorkflowReferenceError {
            kind: ReferenceErrorKind::Context,
            path: "tgId".to_string(),
            node_id: "fi-1".to_string(),
        };
        assert_eq!(err.to_string(), "Field 'context.tgId' is undefined at node fi-1");
    }

    #[test]
    fn engine_error_retains_cause() {
        let cause = anyhow::anyhow!("boom");
        let err = WorkflowEngineError::wrap("Tool node 't1' execution failed", cause);
        assert!(err.cause.is_some());
        assert_eq!(err.to_string(), "Tool node 't1' execution failed: boom");
    }
}
