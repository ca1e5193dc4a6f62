//! The State Client contract (C2).
//!
//! A per-workflow key/value store. The engine never interprets values beyond treating
//! them as opaque JSON; it reads a full snapshot via [`StateClient::get_all_state`] before
//! dispatching a node and writes through [`StateClient::set_state`] from `UpsertState`
//! nodes.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Failure reading from or writing to a state backend. Propagated verbatim by
/// implementations; the scheduler wraps these into a `WorkflowEngineError` identifying
/// the node that triggered them.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("state backend request failed: {0}")]
    Backend(#[source] anyhow::Error),

    #[error("state value for key '{0}' was not valid JSON")]
    Malformed(String),
}

/// Per-workflow persistent key/value state.
///
/// Implementations must be `Send + Sync` since the scheduler holds one behind an `Arc`
/// and calls it from within awaited node executions.
#[async_trait]
pub trait StateClient: Send + Sync {
    /// Reads a single key. Returns `Ok(None)` for an absent key — not an error.
    async fn get_state(&self, key: &str) -> Result<Option<Value>, StateError>;

    /// Writes `key → value`, overwriting any prior value.
    async fn set_state(&self, key: &str, value: Value) -> Result<(), StateError>;

    /// Reads every key currently in the store as a single snapshot.
    async fn get_all_state(&self) -> Result<HashMap<String, Value>, StateError>;
}
