use async_trait::async_trait;
use serde_json::json;

use super::client::LlmClient;
use super::types::{LlmRequest, LlmResponse, TokenUsage};
use crate::error::Result;

/// 离线客户端
///
/// 自由文本调用回显最后一条用户消息；结构化调用回答 `respond` 决策，
/// 没有后端时工具调度 Agent 仍可用
#[derive(Clone, Debug)]
pub struct LocalEchoClient {
    model: String,
}

impl Default for LocalEchoClient {
    fn default() -> Self {
        Self {
            model: "local-echo".to_string(),
        }
    }
}

impl LocalEchoClient {
    pub fn named(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
        }
    }
}

fn word_count(text: &str) -> u64 {
    text.split_whitespace().count() as u64
}

#[async_trait]
impl LlmClient for LocalEchoClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse> {
        let last = request.last_user_content().unwrap_or("look").to_string();
        let content = if request.response_schema.is_some() {
            json!({ "action": "respond", "reply": last }).to_string()
        } else {
            last
        };
        let prompt_tokens = request
            .messages
            .iter()
            .map(|m| word_count(&m.content))
            .sum::<u64>()
            + request.system.as_deref().map(word_count).unwrap_or(0);
        Ok(LlmResponse {
            usage: TokenUsage::from_counts(prompt_tokens, word_count(&content)),
            content,
        })
    }
}
