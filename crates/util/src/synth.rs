//! JSON Schema-driven value synthesis, for the tool runner's test-mode double.
//!
//! A synthesized value always conforms to the schema it was synthesized from — that
//! invariant is what lets a `Tool` node's test-mode double stand in for a real gateway
//! call without the caller ever observing the difference in shape.

use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::{json, Map, Value};

use crate::schema::{resolve_schema, SchemaProperty};

const DEFAULT_ARRAY_LEN_MIN: usize = 1;
const DEFAULT_ARRAY_LEN_MAX: usize = 3;
const DEFAULT_NUMBER_MIN: f64 = 0.0;
const DEFAULT_NUMBER_MAX: f64 = 1000.0;
const OPTIONAL_FIELD_INCLUSION_PROBABILITY: f64 = 0.5;

/// Synthesizes a JSON value conforming to `schema`.
pub fn synthesize(schema: &Value) -> Value {
    let resolved = resolve_schema(schema, schema);
    let mut rng = rand::thread_rng();
    synthesize_value(&resolved, &mut rng)
}

fn synthesize_value(property: &SchemaProperty, rng: &mut impl Rng) -> Value {
    if !property.enum_values.is_empty() {
        return property.enum_values.choose(rng).cloned().unwrap_or(Value::Null);
    }

    match property.r#type.as_str() {
        "object" => synthesize_object(property, rng),
        "array" => synthesize_array(property, rng),
        "integer" => Value::from(rng.gen_range(property.minimum.unwrap_or(DEFAULT_NUMBER_MIN) as i64..=property.maximum.unwrap_or(DEFAULT_NUMBER_MAX) as i64)),
        "number" => {
            let minimum = property.minimum.unwrap_or(DEFAULT_NUMBER_MIN);
            let maximum = property.maximum.unwrap_or(DEFAULT_NUMBER_MAX);
            let value = if minimum < maximum { rng.gen_range(minimum..maximum) } else { minimum };
            json!(value)
        }
        "boolean" => Value::Bool(rng.gen_bool(0.5)),
        _ => synthesize_string(property, rng),
    }
}

fn synthesize_object(property: &SchemaProperty, rng: &mut impl Rng) -> Value {
    let mut map = Map::new();
    if let Some(properties) = &property.properties {
        for (key, child_property) in properties {
            let is_required = property.required.contains(key);
            if is_required || rng.gen_bool(OPTIONAL_FIELD_INCLUSION_PROBABILITY) {
                map.insert(key.clone(), synthesize_value(child_property, rng));
            }
        }
    }
    Value::Object(map)
}

fn synthesize_array(property: &SchemaProperty, rng: &mut impl Rng) -> Value {
    let min_len = property.min_items.unwrap_or(DEFAULT_ARRAY_LEN_MIN);
    let max_len = property.max_items.unwrap_or(DEFAULT_ARRAY_LEN_MAX).max(min_len);
    let len = if min_len < max_len { rng.gen_range(min_len..=max_len) } else { min_len };

    let Some(item_property) = &property.items else {
        return Value::Array(Vec::new());
    };

    (0..len).map(|_| synthesize_value(item_property, rng)).collect()
}

fn synthesize_string(property: &SchemaProperty, rng: &mut impl Rng) -> Value {
    match property.format.as_deref() {
        Some("email") => json!(format!("synthesized{}@example.com", rng.gen_range(0..100_000))),
        Some("uuid") => json!(synthesize_uuid(rng)),
        Some("date-time") => json!(chrono::Utc::now().to_rfc3339()),
        _ => json!(format!("synthesized-{}", rng.gen_range(0..100_000))),
    }
}

fn synthesize_uuid(rng: &mut impl Rng) -> String {
    let mut hex = |len: usize| -> String { (0..len).map(|_| format!("{:x}", rng.gen_range(0..16u8))).collect() };
    format!("{}-{}-{}-{}-{}", hex(8), hex(4), hex(4), hex(4), hex(12))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::validate_input;
    use serde_json::json;

    #[test]
    fn synthesized_object_conforms_to_its_own_schema() {
        let schema = json!({
            "type": "object",
            "required": ["symbol", "price"],
            "properties": {
                "symbol": {"type": "string", "enum": ["BTC", "ETH"]},
                "price": {"type": "number", "minimum": 0, "maximum": 100000},
                "active": {"type": "boolean"},
                "tags": {"type": "array", "items": {"type": "string"}, "minItems": 1, "maxItems": 2}
            }
        });

        for _ in 0..50 {
            let value = synthesize(&schema);
            assert!(validate_input(&value, &schema).is_ok(), "synthesized value failed validation: {value}");
        }
    }

    #[test]
    fn synthesized_uuid_matches_format() {
        let schema = json!({"type": "string", "format": "uuid"});
        let value = synthesize(&schema);
        assert!(validate_input(&value, &schema).is_ok());
    }
}
