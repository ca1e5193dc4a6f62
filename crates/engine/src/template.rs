//! The Template Renderer (C5).
//!
//! Used only inside `FixedInput.output`. Walks a JSON value recursively, passing scalars
//! through untouched and rendering `{{dotted.path}}` expressions inside strings against a
//! `{input, context, state}` render context. `input`/`context` lookups are
//! strict-undefined by default: a path that resolves to nothing (or explicit `null`)
//! raises a [`WorkflowReferenceError`] rather than silently rendering as empty. `state`
//! lookups are always lenient — a missing state key renders as `null`, never an error.

use std::collections::HashMap;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::error::{ReferenceErrorKind, WorkflowReferenceError};
use workflow_util::{get_path, split_first_segment};

/// The context a `FixedInput.output` template renders against.
#[derive(Debug, Clone)]
pub struct RenderContext {
    pub input: Value,
    pub context: Value,
    pub state: HashMap<String, Value>,
    /// Mirrors the engine's `strictUndefinedInTemplates` option. `true` in every
    /// production configuration; `false` only ever used by test harnesses that want
    /// undefined template variables to render as empty string instead of failing.
    pub strict: bool,
}

impl RenderContext {
    pub fn new(input: Value, context: Value, state: HashMap<String, Value>) -> Self {
        Self {
            input,
            context,
            state,
            strict: true,
        }
    }
}

/// A failure rendering a template that is *not* an unresolved-reference error — an
/// unterminated `{{` expression or a reference to a root other than `input`/`context`/`state`.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct TemplateRenderError(pub String);

/// Either shape of failure the renderer can produce. Reference errors propagate to
/// callers unchanged; render errors are wrapped by the scheduler like any other node
/// failure.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error(transparent)]
    Reference(#[from] WorkflowReferenceError),

    #[error(transparent)]
    Render(#[from] TemplateRenderError),
}

/// Recursively renders every templated string inside `value` against `ctx`.
pub fn render(value: &Value, ctx: &RenderContext, node_id: &str) -> Result<Value, TemplateError> {
    match value {
        Value::String(text) => render_string(text, ctx, node_id),
        Value::Array(items) => {
            let rendered: Result<Vec<Value>, TemplateError> = items.iter().map(|item| render(item, ctx, node_id)).collect();
            Ok(Value::Array(rendered?))
        }
        Value::Object(map) => {
            let mut rendered = Map::with_capacity(map.len());
            for (key, item) in map {
                rendered.insert(key.clone(), render(item, ctx, node_id)?);
            }
            Ok(Value::Object(rendered))
        }
        other => Ok(other.clone()),
    }
}

/// Renders a single string. A string that, once trimmed, is exactly one `{{...}}`
/// expression returns the referenced value's native type (so `"{{input.price}}"` against
/// a numeric `input.price` yields a JSON number, not its stringification). Any other
/// string is treated as a template with zero or more embedded expressions, each
/// substituted in place as text.
fn render_string(text: &str, ctx: &RenderContext, node_id: &str) -> Result<Value, TemplateError> {
    let trimmed = text.trim();
    if is_single_expression(trimmed) {
        let path = trimmed[2..trimmed.len() - 2].trim();
        return resolve_path(path, ctx, node_id);
    }

    let mut rendered = String::new();
    let mut rest = text;
    while let Some(start) = rest.find("{{") {
        rendered.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];
        let Some(end) = after_open.find("}}") else {
            return Err(TemplateRenderError(format!("unterminated template expression at node '{node_id}'")).into());
        };
        let path = after_open[..end].trim();
        let value = resolve_path(path, ctx, node_id)?;
        rendered.push_str(&stringify(&value));
        rest = &after_open[end + 2..];
    }
    rendered.push_str(rest);
    Ok(Value::String(rendered))
}

fn is_single_expression(trimmed: &str) -> bool {
    trimmed.starts_with("{{") && trimmed.ends_with("}}") && trimmed.matches("{{").count() == 1 && trimmed.len() >= 4
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn resolve_path(path: &str, ctx: &RenderContext, node_id: &str) -> Result<Value, TemplateError> {
    let (root, rest) = split_first_segment(path);
    let sub_path = rest.unwrap_or("");

    match root {
        "input" => resolve_strict(&ctx.input, sub_path, ReferenceErrorKind::Input, ctx.strict, node_id),
        "context" => resolve_strict(&ctx.context, sub_path, ReferenceErrorKind::Context, ctx.strict, node_id),
        "state" => {
            let state_value = Value::Object(Map::from_iter(ctx.state.iter().map(|(k, v)| (k.clone(), v.clone()))));
            Ok(get_path(&state_value, sub_path).cloned().unwrap_or(Value::Null))
        }
        other => Err(TemplateRenderError(format!("unknown template root '{other}' at node '{node_id}'")).into()),
    }
}

fn resolve_strict(root_value: &Value, sub_path: &str, kind: ReferenceErrorKind, strict: bool, node_id: &str) -> Result<Value, TemplateError> {
    match get_path(root_value, sub_path) {
        Some(value) if !value.is_null() => Ok(value.clone()),
        _ if strict => Err(WorkflowReferenceError {
            kind,
            path: sub_path.to_string(),
            node_id: node_id.to_string(),
        }
        .into()),
        _ => Ok(Value::String(String::new())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx(input: Value, context: Value) -> RenderContext {
        RenderContext::new(input, context, HashMap::new())
    }

    #[test]
    fn passes_scalars_and_literal_strings_through() {
        let value = json!({"a": 1, "b": "plain text", "c": null});
        let rendered = render(&value, &ctx(Value::Null, Value::Null), "n1").unwrap();
        assert_eq!(rendered, value);
    }

    #[test]
    fn single_expression_preserves_native_type() {
        let value = json!("{{input.price}}");
        let rendered = render(&value, &ctx(json!({"price": 42.0}), Value::Null), "n1").unwrap();
        assert_eq!(rendered, json!(42.0));
    }

    #[test]
    fn mixed_text_stringifies_values() {
        let value = json!("price is {{input.price}} usd");
        let rendered = render(&value, &ctx(json!({"price": 42}), Value::Null), "n1").unwrap();
        assert_eq!(rendered, json!("price is 42 usd"));
    }

    #[test]
    fn undefined_input_path_is_reference_error() {
        let value = json!("{{input.missing}}");
        let err = render(&value, &ctx(json!({}), Value::Null), "fi-1").unwrap_err();
        match err {
            TemplateError::Reference(reference) => {
                assert_eq!(reference.kind, ReferenceErrorKind::Input);
                assert_eq!(reference.path, "missing");
                assert_eq!(reference.node_id, "fi-1");
            }
            other => panic!("expected reference error, got {other:?}"),
        }
    }

    #[test]
    fn null_context_path_is_reference_error() {
        let value = json!("{{context.tgId}}");
        let err = render(&value, &ctx(Value::Null, json!({"tgId": null})), "fi-1").unwrap_err();
        assert!(matches!(err, TemplateError::Reference(_)));
    }

    #[test]
    fn missing_state_key_renders_null_not_error() {
        let value = json!("{{state.hasSent}}");
        let rendered = render(&value, &ctx(Value::Null, Value::Null), "n1").unwrap();
        assert_eq!(rendered, Value::Null);
    }

    #[test]
    fn arrays_and_objects_render_recursively() {
        let value = json!({"items": ["{{input.a}}", {"nested": "{{input.b}}"}]});
        let rendered = render(&value, &ctx(json!({"a": 1, "b": "x"}), Value::Null), "n1").unwrap();
        assert_eq!(rendered, json!({"items": [1, {"nested": "x"}]}));
    }

    #[test]
    fn non_strict_mode_renders_undefined_as_empty_string() {
        let mut context = ctx(json!({}), Value::Null);
        context.strict = false;
        let value = json!("{{input.missing}}");
        let rendered = render(&value, &context, "n1").unwrap();
        assert_eq!(rendered, json!(""));
    }
}
