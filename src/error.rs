use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, QuestFlowError>;

#[derive(Debug, Error)]
pub enum QuestFlowError {
    #[error("tool `{0}` not registered")]
    ToolNotRegistered(String),
    #[error("tool `{0}` registered twice")]
    DuplicateTool(String),
    #[error("invalid parameters for tool `{tool}`: {message}")]
    InvalidParameters { tool: String, message: String },
    #[error("malformed decision: {0}")]
    MalformedDecision(String),
    #[error("rate limited by model backend")]
    RateLimited { retry_after: Option<Duration> },
    #[error("model request failed: {0}")]
    Llm(String),
    #[error("game session failed to start: {0}")]
    SessionStart(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl QuestFlowError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, QuestFlowError::RateLimited { .. })
    }
}

impl From<serde_json::Error> for QuestFlowError {
    fn from(error: serde_json::Error) -> Self {
        QuestFlowError::Serialization(error.to_string())
    }
}
