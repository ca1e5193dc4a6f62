//! Cycle-safe JSON Schema resolution.
//!
//! Flattens a JSON Schema document (including `$ref`, `anyOf`/`oneOf`/`allOf`) into a
//! [`SchemaProperty`] tree that [`crate::validate`] and [`crate::synth`] both walk. The
//! resolution strategy — bounding recursion depth and short-circuiting repeated `$ref`
//! pointers in the active resolution path — started life resolving command output
//! metadata for self-referential schemas; here it backs tool input/output validation and
//! synthesis instead.

use serde_json::Value;
use std::collections::{HashMap, HashSet};

const MAX_SCHEMA_RESOLUTION_DEPTH: usize = 128;

/// A resolved JSON Schema node, flattened from `$ref`/`anyOf`/`oneOf`/`allOf` into a
/// single concrete shape.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaProperty {
    pub r#type: String,
    pub description: String,
    pub properties: Option<HashMap<String, Box<SchemaProperty>>>,
    pub required: Vec<String>,
    pub items: Option<Box<SchemaProperty>>,
    pub enum_values: Vec<Value>,
    pub format: Option<String>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub min_items: Option<usize>,
    pub max_items: Option<usize>,
}

#[derive(Default)]
struct SchemaResolutionContext {
    depth: usize,
    visited_references: HashSet<String>,
}

/// Resolves a schema definition into a [`SchemaProperty`] tree.
///
/// `root` is the document `$ref` pointers are resolved against. Tool input/output schemas
/// are almost always self-contained, so callers typically pass the same value for both
/// arguments.
pub fn resolve_schema(schema: &Value, root: &Value) -> SchemaProperty {
    let mut context = SchemaResolutionContext::default();
    resolve_schema_internal(schema, root, &mut context)
}

fn resolve_schema_internal(schema: &Value, root: &Value, context: &mut SchemaResolutionContext) -> SchemaProperty {
    let schema_reference = extract_schema_reference(schema);

    with_resolution_frame(
        context,
        schema_reference,
        unresolved_schema_property,
        |context| {
            let schema_type = get_type(schema, root);
            let description = get_description(schema, root).unwrap_or_default();
            let resolved_map = resolve_schema_map(schema, root);

            let properties = resolved_map
                .and_then(|map| map.get("properties"))
                .and_then(Value::as_object)
                .map(|properties| {
                    let mut collected: HashMap<String, Box<SchemaProperty>> = HashMap::new();
                    for (key, value) in properties {
                        collected.insert(key.to_string(), Box::new(resolve_schema_internal(value, root, context)));
                    }
                    collected
                })
                .filter(|properties: &HashMap<String, Box<SchemaProperty>>| !properties.is_empty());

            let items = if schema_type == "array" {
                resolve_array_items_internal(schema, resolved_map, root, context).map(Box::new)
            } else {
                None
            };

            let required = resolved_map
                .and_then(|map| map.get("required"))
                .and_then(Value::as_array)
                .map(|values| values.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
                .unwrap_or_default();

            let enum_values = schema
                .get("enum")
                .or_else(|| resolved_map.and_then(|map| map.get("enum")))
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();

            let format = resolve_format(schema, resolved_map);
            let minimum = resolve_number(schema, resolved_map, "minimum");
            let maximum = resolve_number(schema, resolved_map, "maximum");
            let min_items = resolve_number(schema, resolved_map, "minItems").map(|n| n as usize);
            let max_items = resolve_number(schema, resolved_map, "maxItems").map(|n| n as usize);

            SchemaProperty {
                r#type: schema_type,
                description,
                properties,
                required,
                items,
                enum_values,
                format,
                minimum,
                maximum,
                min_items,
                max_items,
            }
        },
    )
}

fn unresolved_schema_property() -> SchemaProperty {
    SchemaProperty {
        r#type: "string".to_string(),
        ..Default::default()
    }
}

fn extract_schema_reference(schema: &Value) -> Option<&str> {
    schema.as_str().or_else(|| schema.get("$ref").and_then(Value::as_str))
}

fn normalize_reference(reference: &str) -> String {
    reference.strip_prefix('#').unwrap_or(reference).to_string()
}

fn with_resolution_frame<T, FResolver, FFallback>(
    context: &mut SchemaResolutionContext,
    maybe_reference: Option<&str>,
    fallback: FFallback,
    resolver: FResolver,
) -> T
where
    FResolver: FnOnce(&mut SchemaResolutionContext) -> T,
    FFallback: FnOnce() -> T,
{
    if context.depth >= MAX_SCHEMA_RESOLUTION_DEPTH {
        return fallback();
    }

    let normalized_reference = maybe_reference.map(normalize_reference);
    if let Some(reference) = normalized_reference.as_ref()
        && !context.visited_references.insert(reference.clone())
    {
        return fallback();
    }

    context.depth += 1;
    let result = resolver(context);
    context.depth -= 1;

    if let Some(reference) = normalized_reference {
        context.visited_references.remove(&reference);
    }

    result
}

/// Recursively resolves the description from a schema, following `$ref` or combining
/// `anyOf`/`oneOf`/`allOf`.
pub fn get_description(schema: &Value, root: &Value) -> Option<String> {
    let mut context = SchemaResolutionContext::default();
    get_description_internal(schema, root, &mut context)
}

fn get_description_internal(schema: &Value, root: &Value, context: &mut SchemaResolutionContext) -> Option<String> {
    let schema_reference = schema.get("$ref").and_then(Value::as_str);

    with_resolution_frame(
        context,
        schema_reference,
        || None,
        |context| {
            if let Some(reference) = schema_reference {
                let pointer = normalize_reference(reference);
                return root
                    .pointer(&pointer)
                    .and_then(|target| get_description_internal(target, root, context));
            }

            if let Some(description) = schema.get("description").and_then(Value::as_str) {
                return Some(description.to_string());
            }

            for key in ["anyOf", "oneOf"] {
                if let Some(array) = schema.get(key).and_then(Value::as_array) {
                    let descriptions: Vec<String> = array
                        .iter()
                        .filter_map(|item| get_description_internal(item, root, context))
                        .collect();
                    if !descriptions.is_empty() {
                        return Some(descriptions.join(" or "));
                    }
                }
            }

            if let Some(array) = schema.get("allOf").and_then(Value::as_array) {
                let descriptions: Vec<String> = array
                    .iter()
                    .filter_map(|item| get_description_internal(item, root, context))
                    .collect();
                if !descriptions.is_empty() {
                    return Some(descriptions.join(" and "));
                }
            }

            None
        },
    )
}

/// Recursively resolves the type from a schema, handling `$ref`, direct types, or
/// `anyOf`/`oneOf` unions that agree on a single type. Defaults to `"string"`.
pub fn get_type(schema: &Value, root: &Value) -> String {
    let mut context = SchemaResolutionContext::default();
    get_type_internal(schema, root, &mut context)
}

fn get_type_internal(schema: &Value, root: &Value, context: &mut SchemaResolutionContext) -> String {
    let schema_reference = schema.get("$ref").and_then(Value::as_str);

    with_resolution_frame(
        context,
        schema_reference,
        || "string".to_string(),
        |context| {
            if let Some(reference) = schema_reference {
                let pointer = normalize_reference(reference);
                return root
                    .pointer(&pointer)
                    .map_or("string".to_string(), |target| get_type_internal(target, root, context));
            }

            if let Some(schema_type) = schema.get("type") {
                if let Some(schema_type_name) = schema_type.as_str() {
                    return schema_type_name.to_string();
                }
                if let Some(type_array) = schema_type.as_array() {
                    let types: HashSet<String> = type_array
                        .iter()
                        .filter_map(|value| value.as_str().map(str::to_string))
                        .filter(|type_name| type_name != "null")
                        .collect();
                    if types.len() == 1 {
                        return types.into_iter().next().unwrap_or_else(|| "string".to_string());
                    }
                }
            }

            for key in ["anyOf", "oneOf"] {
                if let Some(array) = schema.get(key).and_then(Value::as_array) {
                    let types: HashSet<String> = array.iter().map(|item| get_type_internal(item, root, context)).collect();
                    if types.len() == 1 {
                        return types.into_iter().next().unwrap_or_else(|| "string".to_string());
                    }
                }
            }

            "string".to_string()
        },
    )
}

fn resolve_schema_map<'a>(schema: &'a Value, root: &'a Value) -> Option<&'a serde_json::Map<String, Value>> {
    if let Some(reference) = schema.as_str() {
        let pointer = reference.strip_prefix('#').unwrap_or(reference);
        return root.pointer(pointer).and_then(Value::as_object);
    }

    if let Some(reference) = schema.get("$ref").and_then(Value::as_str) {
        let pointer = reference.strip_prefix('#').unwrap_or(reference);
        return root.pointer(pointer).and_then(Value::as_object);
    }

    schema.as_object()
}

fn resolve_array_items_internal(
    schema: &Value,
    resolved_map: Option<&serde_json::Map<String, Value>>,
    root: &Value,
    context: &mut SchemaResolutionContext,
) -> Option<SchemaProperty> {
    let inline_items = schema.get("items");
    let resolved_items = resolved_map.and_then(|map| map.get("items"));
    let item_schema = inline_items.or(resolved_items)?;

    match item_schema {
        Value::Array(values) => values.first().map(|value| resolve_schema_internal(value, root, context)),
        other => Some(resolve_schema_internal(other, root, context)),
    }
}

fn resolve_format(schema: &Value, resolved_map: Option<&serde_json::Map<String, Value>>) -> Option<String> {
    schema
        .get("format")
        .or_else(|| resolved_map.and_then(|map| map.get("format")))
        .and_then(Value::as_str)
        .map(ToString::to_string)
}

fn resolve_number(schema: &Value, resolved_map: Option<&serde_json::Map<String, Value>>, key: &str) -> Option<f64> {
    schema
        .get(key)
        .or_else(|| resolved_map.and_then(|map| map.get(key)))
        .and_then(Value::as_f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resolve_schema_handles_self_referential_refs() {
        let root = json!({
            "components": {
                "schemas": {
                    "Node": {
                        "type": "object",
                        "properties": {
                            "next": { "$ref": "#/components/schemas/Node" }
                        }
                    }
                }
            }
        });
        let schema = json!({ "$ref": "#/components/schemas/Node" });

        let resolved = resolve_schema(&schema, &root);
        assert_eq!(resolved.r#type, "object");

        let next_property = resolved.properties.and_then(|p| p.get("next").cloned()).expect("next property");
        assert_eq!(next_property.r#type, "string");
    }

    #[test]
    fn resolve_schema_handles_mutual_recursive_refs() {
        let root = json!({
            "components": {
                "schemas": {
                    "A": {"type": "object", "properties": {"b": {"$ref": "#/components/schemas/B"}}},
                    "B": {"type": "object", "properties": {"a": {"$ref": "#/components/schemas/A"}}}
                }
            }
        });
        let schema = json!({ "$ref": "#/components/schemas/A" });

        let resolved = resolve_schema(&schema, &root);
        let b = resolved.properties.and_then(|p| p.get("b").cloned()).expect("b property");
        let a = b.properties.and_then(|p| p.get("a").cloned()).expect("a property");
        assert_eq!(a.r#type, "string");
    }

    #[test]
    fn get_type_returns_string_when_ref_cycle_is_detected() {
        let root = json!({
            "components": { "schemas": { "Node": { "$ref": "#/components/schemas/Node" } } }
        });
        let schema = json!({ "$ref": "#/components/schemas/Node" });
        assert_eq!(get_type(&schema, &root), "string");
    }

    #[test]
    fn resolves_constraints() {
        let schema = json!({
            "type": "object",
            "properties": {
                "price": {"type": "number", "minimum": 0, "maximum": 100},
                "tags": {"type": "array", "items": {"type": "string"}, "minItems": 1, "maxItems": 3}
            },
            "required": ["price"]
        });
        let resolved = resolve_schema(&schema, &schema);
        assert_eq!(resolved.required, vec!["price".to_string()]);
        let price = resolved.properties.as_ref().unwrap().get("price").unwrap();
        assert_eq!(price.minimum, Some(0.0));
        assert_eq!(price.maximum, Some(100.0));
        let tags = resolved.properties.as_ref().unwrap().get("tags").unwrap();
        assert_eq!(tags.min_items, Some(1));
        assert_eq!(tags.max_items, Some(3));
    }
}
