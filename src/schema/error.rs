use thiserror::Error;

use crate::error::QuestFlowError;

/// Schema 错误类型
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("schema validation failed at `{}`: {message}", path.join("."))]
    Validation { message: String, path: Vec<String> },
}

impl From<SchemaError> for QuestFlowError {
    fn from(error: SchemaError) -> Self {
        QuestFlowError::Other(anyhow::anyhow!(error))
    }
}
