//! Schema validation helpers.
//!
//! Validates a `serde_json::Value` configuration against a [`Schema`] and
//! reports problems as diagnostics attributed to the offending attribute.
//!
//! # Example
//!
//! ```
//! use hemmer_provider_putio::schema::{Schema, Attribute};
//! use hemmer_provider_putio::validation::validate;
//! use serde_json::json;
//!
//! let schema = Schema::v0()
//!     .with_attribute("title", Attribute::required_string())
//!     .with_attribute("parent_dir_id", Attribute::optional_computed_int64());
//!
//! let diagnostics = validate(&schema, &json!({"title": "one", "parent_dir_id": 0}));
//! assert!(diagnostics.is_empty());
//!
//! let diagnostics = validate(&schema, &json!({"title": "one", "parent_dir_id": "root"}));
//! assert_eq!(diagnostics.len(), 1);
//! assert_eq!(diagnostics[0].attribute, Some("parent_dir_id".to_string()));
//! ```

use crate::schema::{Attribute, AttributeType, Diagnostic, Schema};
use serde_json::Value;

/// Validate a JSON value against a schema.
///
/// Returns a list of diagnostics for any validation errors found.
/// An empty list means the value is valid.
///
/// # Validation Rules
///
/// - Required attributes must be present and non-null
/// - Optional attributes may be absent or null
/// - Computed-only attributes are skipped (the provider sets these)
/// - Attribute types must match the schema
pub fn validate(schema: &Schema, value: &Value) -> Vec<Diagnostic> {
    let obj = match value {
        Value::Object(map) => map,
        // A null configuration is treated as empty.
        Value::Null => return missing_required(schema),
        _ => {
            return vec![Diagnostic::error("Expected object")
                .with_detail(format!("Got {}", value_type_name(value)))]
        }
    };

    let mut diagnostics = Vec::new();
    for (name, attr) in &schema.block.attributes {
        validate_attribute(attr, obj.get(name), name, &mut diagnostics);
    }
    diagnostics
}

fn missing_required(schema: &Schema) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for (name, attr) in &schema.block.attributes {
        validate_attribute(attr, None, name, &mut diagnostics);
    }
    diagnostics
}

fn validate_attribute(
    attr: &Attribute,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if attr.flags.computed && !attr.flags.optional && !attr.flags.required {
        return;
    }

    match value {
        None | Some(Value::Null) => {
            if attr.flags.required {
                diagnostics.push(
                    Diagnostic::error(format!("Missing required attribute '{}'", path))
                        .with_detail("This attribute is required and must be provided")
                        .with_attribute(path),
                );
            }
        }
        Some(v) => {
            if !matches_type(attr.attr_type, v) {
                diagnostics.push(type_error(path, attr.attr_type, v));
            }
        }
    }
}

/// Whether a non-null JSON value decodes as the given attribute type.
pub(crate) fn matches_type(attr_type: AttributeType, value: &Value) -> bool {
    match attr_type {
        AttributeType::String => value.is_string(),
        AttributeType::Int64 => is_int64(value),
        AttributeType::Bool => value.is_boolean(),
    }
}

pub(crate) fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn is_int64(value: &Value) -> bool {
    match value {
        Value::Number(n) => {
            if n.is_i64() {
                true
            } else if let Some(f) = n.as_f64() {
                // 42.0 is still an integer
                f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64
            } else {
                false
            }
        }
        _ => false,
    }
}

fn type_error(path: &str, expected: AttributeType, got: &Value) -> Diagnostic {
    Diagnostic::error(format!("Invalid type for attribute '{}'", path))
        .with_detail(format!(
            "Expected {}, got {}",
            expected.name(),
            value_type_name(got)
        ))
        .with_attribute(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Attribute;
    use serde_json::json;

    fn feed_like_schema() -> Schema {
        Schema::v0()
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("title", Attribute::required_string())
            .with_attribute("parent_dir_id", Attribute::optional_computed_int64())
            .with_attribute("paused", Attribute::optional_computed_bool())
    }

    #[test]
    fn test_validate_required_string() {
        let schema = feed_like_schema();

        assert!(validate(&schema, &json!({"title": "one"})).is_empty());

        let diagnostics = validate(&schema, &json!({}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("title".to_string()));

        let diagnostics = validate(&schema, &json!({"title": null}));
        assert_eq!(diagnostics.len(), 1);

        let diagnostics = validate(&schema, &json!({"title": 123}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Invalid type"));
    }

    #[test]
    fn test_validate_optional_attribute() {
        let schema = feed_like_schema();

        assert!(validate(&schema, &json!({"title": "t", "parent_dir_id": 42})).is_empty());
        assert!(validate(&schema, &json!({"title": "t", "parent_dir_id": null})).is_empty());

        let diagnostics = validate(&schema, &json!({"title": "t", "parent_dir_id": "42"}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics[0].detail,
            Some("Expected int64, got string".to_string())
        );
    }

    #[test]
    fn test_validate_computed_attribute_skipped() {
        let schema = feed_like_schema();
        // Even with a wrong type, computed-only attributes are not validated.
        assert!(validate(&schema, &json!({"title": "t", "id": 123})).is_empty());
    }

    #[test]
    fn test_validate_int64() {
        let schema = feed_like_schema();

        assert!(validate(&schema, &json!({"title": "t", "parent_dir_id": 42.0})).is_empty());
        assert_eq!(
            validate(&schema, &json!({"title": "t", "parent_dir_id": 42.5})).len(),
            1
        );
    }

    #[test]
    fn test_validate_bool() {
        let schema = feed_like_schema();

        assert!(validate(&schema, &json!({"title": "t", "paused": false})).is_empty());
        assert_eq!(
            validate(&schema, &json!({"title": "t", "paused": "false"})).len(),
            1
        );
    }

    #[test]
    fn test_validate_multiple_errors() {
        let schema = feed_like_schema();
        let diagnostics = validate(&schema, &json!({"parent_dir_id": "x", "paused": 1}));
        assert_eq!(diagnostics.len(), 3);
    }

    #[test]
    fn test_validate_null_config() {
        let schema = feed_like_schema();
        let diagnostics = validate(&schema, &Value::Null);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("title".to_string()));
    }

    #[test]
    fn test_validate_root_not_object() {
        let schema = feed_like_schema();
        let diagnostics = validate(&schema, &json!("not an object"));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Expected object"));
    }
}
