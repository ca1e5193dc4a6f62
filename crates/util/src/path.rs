//! Dotted-path navigation over `serde_json::Value` trees.
//!
//! Shared by the template renderer (resolving `{{input.foo.bar}}` against a render
//! context) and by schema-driven diagnostics that need to describe where in a payload a
//! field lives.

use serde_json::Value;

/// Navigates `value` through a dot-separated path, e.g. `"owner.id"` or `"items.0.name"`.
///
/// Numeric segments index into arrays; any other segment looks up an object key. Returns
/// `None` as soon as a segment cannot be resolved (missing key, out-of-range index, or a
/// non-container value encountered mid-path). An empty path returns `value` itself.
pub fn get_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for segment in path.split('.').filter(|s| !s.is_empty()) {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Splits a dotted path into its first segment and the remainder (if any).
///
/// `"input.foo.bar"` splits into `("input", Some("foo.bar"))`; `"input"` splits into
/// `("input", None)`.
pub fn split_first_segment(path: &str) -> (&str, Option<&str>) {
    match path.split_once('.') {
        Some((first, rest)) => (first, Some(rest)),
        None => (path, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn navigates_nested_objects() {
        let value = json!({"a": {"b": {"c": 1}}});
        assert_eq!(get_path(&value, "a.b.c"), Some(&json!(1)));
    }

    #[test]
    fn navigates_array_indices() {
        let value = json!({"items": [{"id": "x"}, {"id": "y"}]});
        assert_eq!(get_path(&value, "items.1.id"), Some(&json!("y")));
    }

    #[test]
    fn missing_segment_is_none() {
        let value = json!({"a": 1});
        assert_eq!(get_path(&value, "a.b"), None);
        assert_eq!(get_path(&value, "missing"), None);
    }

    #[test]
    fn empty_path_returns_root() {
        let value = json!({"a": 1});
        assert_eq!(get_path(&value, ""), Some(&value));
    }

    #[test]
    fn splits_first_segment() {
        assert_eq!(split_first_segment("input.foo.bar"), ("input", Some("foo.bar")));
        assert_eq!(split_first_segment("input"), ("input", None));
    }
}
