use std::sync::Arc;

use async_trait::async_trait;

use super::types::{LlmRequest, LlmResponse};
use crate::error::Result;

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// 用量归属的模型标识
    fn model(&self) -> &str;

    /// 一次生成；设置 `response_schema` 时内容为 JSON 文本
    ///
    /// 后端限流时返回 `QuestFlowError::RateLimited`
    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse>;
}

pub type DynLlmClient = Arc<dyn LlmClient>;
