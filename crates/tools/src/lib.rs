//! Tool Runner implementations for the workflow engine.
//!
//! [`RealToolRunner`] speaks the production tool gateway's wire contract;
//! [`TestToolRunner`] is a policy-driven double used by tests and dry-run evaluation.

pub mod real;
pub mod test_runner;

pub use real::RealToolRunner;
pub use test_runner::{TestToolMode, TestToolRunner, ToolPolicy};
