//! JSON Schema validation, producing one human-readable violation per defect rather than
//! failing fast on the first one — a tool call that fails validation should tell its
//! caller everything wrong with the payload in one round trip.

use serde_json::Value;

use crate::schema::{resolve_schema, SchemaProperty};

/// Validates `input` against `schema`, collecting every violation rather than stopping at
/// the first. Returns `Ok(())` when the document conforms.
pub fn validate_input(input: &Value, schema: &Value) -> Result<(), Vec<String>> {
    let resolved = resolve_schema(schema, schema);
    let mut violations = Vec::new();
    validate_value("$", input, &resolved, &mut violations);

    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}

fn validate_value(path: &str, value: &Value, property: &SchemaProperty, violations: &mut Vec<String>) {
    if !type_matches(value, &property.r#type) {
        violations.push(format!("{path}: expected {}, got {}", property.r#type, describe_type(value)));
        return;
    }

    if !property.enum_values.is_empty() && !property.enum_values.contains(value) {
        violations.push(format!("{path}: value is not one of the allowed enum values"));
    }

    match value {
        Value::Object(map) => {
            for field in &property.required {
                if !map.contains_key(field) {
                    violations.push(format!("{path}.{field}: missing required field"));
                }
            }
            if let Some(properties) = &property.properties {
                for (key, child_value) in map {
                    if let Some(child_property) = properties.get(key) {
                        validate_value(&format!("{path}.{key}"), child_value, child_property, violations);
                    }
                }
            }
        }
        Value::Array(items) => {
            if let Some(min_items) = property.min_items
                && items.len() < min_items
            {
                violations.push(format!("{path}: expected at least {min_items} items, got {}", items.len()));
            }
            if let Some(max_items) = property.max_items
                && items.len() > max_items
            {
                violations.push(format!("{path}: expected at most {max_items} items, got {}", items.len()));
            }
            if let Some(item_property) = &property.items {
                for (index, item) in items.iter().enumerate() {
                    validate_value(&format!("{path}[{index}]"), item, item_property, violations);
                }
            }
        }
        Value::Number(number) => {
            if let Some(minimum) = property.minimum
                && number.as_f64().is_some_and(|n| n < minimum)
            {
                violations.push(format!("{path}: expected >= {minimum}, got {number}"));
            }
            if let Some(maximum) = property.maximum
                && number.as_f64().is_some_and(|n| n > maximum)
            {
                violations.push(format!("{path}: expected <= {maximum}, got {number}"));
            }
        }
        Value::String(text) => {
            if let Some(format) = &property.format
                && !matches_format(text, format)
            {
                violations.push(format!("{path}: value does not match format '{format}'"));
            }
        }
        _ => {}
    }
}

fn type_matches(value: &Value, expected: &str) -> bool {
    match expected {
        "object" => value.is_object(),
        "array" => value.is_array(),
        "string" => value.is_string(),
        "boolean" => value.is_boolean(),
        "integer" => value.as_i64().is_some() || value.as_u64().is_some(),
        "number" => value.is_number(),
        "null" => value.is_null(),
        _ => true,
    }
}

fn describe_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn matches_format(text: &str, format: &str) -> bool {
    match format {
        "email" => text.contains('@') && !text.starts_with('@') && !text.ends_with('@'),
        "uuid" => is_uuid_like(text),
        "date-time" => chrono::DateTime::parse_from_rfc3339(text).is_ok(),
        _ => true,
    }
}

fn is_uuid_like(text: &str) -> bool {
    let segments: Vec<&str> = text.split('-').collect();
    let expected_lengths = [8, 4, 4, 4, 12];
    segments.len() == 5
        && segments
            .iter()
            .zip(expected_lengths)
            .all(|(segment, length)| segment.len() == length && segment.chars().all(|c| c.is_ascii_hexdigit()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> Value {
        json!({
            "type": "object",
            "required": ["symbol", "price"],
            "properties": {
                "symbol": {"type": "string", "enum": ["BTC", "ETH"]},
                "price": {"type": "number", "minimum": 0},
                "tags": {"type": "array", "items": {"type": "string"}, "minItems": 1}
            }
        })
    }

    #[test]
    fn accepts_conforming_input() {
        let input = json!({"symbol": "BTC", "price": 42000.0, "tags": ["spot"]});
        assert!(validate_input(&input, &schema()).is_ok());
    }

    #[test]
    fn reports_missing_required_field() {
        let input = json!({"price": 1.0});
        let violations = validate_input(&input, &schema()).unwrap_err();
        assert!(violations.iter().any(|v| v.contains("symbol") && v.contains("missing required field")));
    }

    #[test]
    fn reports_enum_violation() {
        let input = json!({"symbol": "DOGE", "price": 1.0});
        let violations = validate_input(&input, &schema()).unwrap_err();
        assert!(violations.iter().any(|v| v.contains("$.symbol")));
    }

    #[test]
    fn reports_out_of_range_number() {
        let input = json!({"symbol": "BTC", "price": -5.0});
        let violations = validate_input(&input, &schema()).unwrap_err();
        assert!(violations.iter().any(|v| v.contains("$.price")));
    }

    #[test]
    fn reports_array_below_min_items() {
        let input = json!({"symbol": "BTC", "price": 1.0, "tags": []});
        let violations = validate_input(&input, &schema()).unwrap_err();
        assert!(violations.iter().any(|v| v.contains("at least 1 items")));
    }

    #[test]
    fn format_validators_accept_known_shapes() {
        assert!(matches_format("user@example.com", "email"));
        assert!(!matches_format("not-an-email", "email"));
        assert!(matches_format("123e4567-e89b-12d3-a456-426614174000", "uuid"));
        assert!(!matches_format("not-a-uuid", "uuid"));
        assert!(matches_format("2024-01-01T00:00:00Z", "date-time"));
        assert!(!matches_format("not-a-date", "date-time"));
    }
}
