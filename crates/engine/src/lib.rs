//! The workflow execution engine core: the collaborator contracts (State Client, JS
//! Handler Runner, Tool Runner), the template renderer, the graph walker, and the
//! scheduler that ties them together.
//!
//! This crate has no opinion on *how* its three collaborators are implemented —
//! `workflow-state`, `workflow-js`, and `workflow-tools` each provide a production and a
//! test-double implementation of the traits defined here.

pub mod error;
pub mod graph;
pub mod js;
pub mod state;
pub mod scheduler;
pub mod template;
pub mod tools;

pub use error::{EngineError, ReferenceErrorKind, WorkflowEngineError, WorkflowReferenceError};
pub use graph::{classify, find_by_id, parents_of, NodeShape};
pub use js::{HandlerContext, HandlerError, HandlerMeta, JsHandlerRunner};
pub use scheduler::{EngineConfig, WorkflowEngine};
pub use state::{StateClient, StateError};
pub use template::{render, RenderContext, TemplateError};
pub use tools::{ToolError, ToolRunner};
