mod error;
mod schema;
mod validation;

pub use error::SchemaError;
pub use schema::{Schema, SchemaKind};
pub use validation::validate_value;

/// 从根路径开始按 `schema` 校验 `value`
pub fn validate(schema: &Schema, value: &serde_json::Value) -> std::result::Result<(), SchemaError> {
    validate_value(schema, value, &mut Vec::new())
}
