//! Shared JSON Schema and path-navigation helpers used by the tool runner, template
//! renderer, and test-mode doubles.

pub mod path;
pub mod schema;
pub mod synth;
pub mod validate;

pub use path::{get_path, split_first_segment};
pub use schema::{resolve_schema, SchemaProperty};
pub use synth::synthesize;
pub use validate::validate_input;
