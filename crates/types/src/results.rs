//! Value-result validators for handler return values at execution boundaries.
//!
//! These are small and deliberately permissive: the heavy parsing already happened once
//! at ingress (see [`crate::parse`]); here we only need to check the *shape* of whatever
//! a handler returned, since handlers are untrusted user code and a `Condition`/`Boolean`
//! node's output drives scheduling decisions.

use serde_json::Value;
use thiserror::Error;

/// A `Condition` handler must return `null` (terminate) or the identifier of exactly one
/// child to run next.
pub type ConditionResult = Option<String>;

/// A `Boolean` handler must return a boolean.
pub type BooleanResult = bool;

/// A `Converter` handler's return value is unconstrained JSON.
pub type ConverterResult = Value;

/// Failure decoding a handler's return value into the shape its node type requires.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResultError {
    #[error("Condition handler must return null or a string identifier, got {0}")]
    InvalidCondition(String),
    #[error("Boolean handler must return a boolean, got {0}")]
    InvalidBoolean(String),
}

/// Parses a `Condition` handler's return value.
pub fn parse_condition_result(value: &Value) -> Result<ConditionResult, ResultError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        other => Err(ResultError::InvalidCondition(describe(other))),
    }
}

/// Parses a `Boolean` handler's return value.
pub fn parse_boolean_result(value: &Value) -> Result<BooleanResult, ResultError> {
    match value {
        Value::Bool(b) => Ok(*b),
        other => Err(ResultError::InvalidBoolean(describe(other))),
    }
}

/// A `Converter` handler's return value needs no validation beyond being valid JSON,
/// which is already guaranteed by the JS runner's marshalling.
pub fn parse_converter_result(value: &Value) -> ConverterResult {
    value.clone()
}

fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(_) => "a boolean".to_string(),
        Value::Number(_) => "a number".to_string(),
        Value::String(_) => "a string".to_string(),
        Value::Array(_) => "an array".to_string(),
        Value::Object(_) => "an object".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn condition_accepts_null_and_string() {
        assert_eq!(parse_condition_result(&json!(null)).unwrap(), None);
        assert_eq!(parse_condition_result(&json!("next")).unwrap(), Some("next".to_string()));
    }

    #[test]
    fn condition_rejects_other_types() {
        assert!(parse_condition_result(&json!(42)).is_err());
        assert!(parse_condition_result(&json!(true)).is_err());
    }

    #[test]
    fn boolean_accepts_only_bool() {
        assert_eq!(parse_boolean_result(&json!(true)).unwrap(), true);
        assert!(parse_boolean_result(&json!("true")).is_err());
    }
}
