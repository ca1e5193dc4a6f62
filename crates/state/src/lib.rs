//! State Client implementations for the workflow engine.
//!
//! [`DurableStateClient`] talks to a shared HTTP-backed key/value service; [`TestStateClient`]
//! is a deterministic in-memory double for tests and dry-run evaluation.

pub mod durable_client;
pub mod test_client;

pub use durable_client::DurableStateClient;
pub use test_client::TestStateClient;
