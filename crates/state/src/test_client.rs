//! The in-memory test double for [`StateClient`].
//!
//! Deterministic and isolated: each instance owns its own mapping, with no shared
//! backend, no namespace scoping, and no network calls. Used in tests and whenever the
//! engine is configured for dry-run evaluation.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use workflow_engine::{StateClient, StateError};

/// An in-memory [`StateClient`], optionally seeded with an initial mapping.
#[derive(Debug, Default)]
pub struct TestStateClient {
    values: Mutex<HashMap<String, Value>>,
}

impl TestStateClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Constructs a client pre-populated with `initial`, as scenario (3)-(5) in the
    /// specification's end-to-end tests require ("starting state `{hasSent:true}`").
    pub fn seeded(initial: HashMap<String, Value>) -> Self {
        Self {
            values: Mutex::new(initial),
        }
    }

    /// Snapshots the current state without going through the `StateClient` trait — handy
    /// in tests asserting on final state shape.
    pub fn snapshot(&self) -> HashMap<String, Value> {
        self.values.lock().expect("state mutex poisoned").clone()
    }
}

#[async_trait]
impl StateClient for TestStateClient {
    async fn get_state(&self, key: &str) -> Result<Option<Value>, StateError> {
        Ok(self.values.lock().expect("state mutex poisoned").get(key).cloned())
    }

    async fn set_state(&self, key: &str, value: Value) -> Result<(), StateError> {
        self.values.lock().expect("state mutex poisoned").insert(key.to_string(), value);
        Ok(())
    }

    async fn get_all_state(&self) -> Result<HashMap<String, Value>, StateError> {
        Ok(self.values.lock().expect("state mutex poisoned").clone())
    }
}
