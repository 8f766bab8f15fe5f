use serde_json::Value;

use super::error::SchemaError;
use super::schema::{Schema, SchemaKind};

fn mismatch(expected: &str, value: &Value, path: &[String]) -> SchemaError {
    SchemaError::Validation {
        message: format!("expected {expected}, found {}", kind_of(value)),
        path: path.to_vec(),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// 验证值是否符合 Schema
pub fn validate_value(
    schema: &Schema,
    value: &Value,
    path: &mut Vec<String>,
) -> std::result::Result<(), SchemaError> {
    match &schema.kind {
        SchemaKind::Null if !value.is_null() => return Err(mismatch("null", value, path)),
        SchemaKind::Boolean if !value.is_boolean() => {
            return Err(mismatch("boolean", value, path))
        }
        SchemaKind::Integer if !(value.is_i64() || value.is_u64()) => {
            return Err(mismatch("integer", value, path))
        }
        SchemaKind::Number if !value.is_number() => return Err(mismatch("number", value, path)),
        SchemaKind::String if !value.is_string() => return Err(mismatch("string", value, path)),
        SchemaKind::Array { items } => {
            let array = value
                .as_array()
                .ok_or_else(|| mismatch("array", value, path))?;
            for (idx, element) in array.iter().enumerate() {
                path.push(idx.to_string());
                validate_value(items, element, path)?;
                path.pop();
            }
        }
        SchemaKind::Object {
            properties,
            required,
            additional,
        } => {
            let object = value
                .as_object()
                .ok_or_else(|| mismatch("object", value, path))?;

            if let Some(key) = required.iter().find(|key| !object.contains_key(*key)) {
                let mut required_path = path.clone();
                required_path.push(key.clone());
                return Err(SchemaError::Validation {
                    message: format!("missing required property `{key}`"),
                    path: required_path,
                });
            }

            for (key, val) in object {
                path.push(key.clone());
                match properties.get(key) {
                    Some(sub_schema) => validate_value(sub_schema, val, path)?,
                    None if !additional => {
                        return Err(SchemaError::Validation {
                            message: format!("unexpected property `{key}`"),
                            path: path.clone(),
                        })
                    }
                    None => {}
                }
                path.pop();
            }
        }
        _ => {}
    }

    Ok(())
}
