use std::ops::AddAssign;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::agent::{Message, MessageRole};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LlmMessage {
    pub role: MessageRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
}

impl From<&Message> for LlmMessage {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role,
            content: message.content.clone(),
            tool: message.tool.as_ref().map(|link| link.tool.clone()),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LlmRequest {
    #[serde(default)]
    pub system: Option<String>,
    pub messages: Vec<LlmMessage>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// 存在时后端必须返回符合该 schema 的 JSON
    #[serde(default)]
    pub response_schema: Option<Value>,
}

fn default_temperature() -> f32 {
    0.2
}

impl LlmRequest {
    pub fn new(system: Option<String>, messages: Vec<LlmMessage>) -> Self {
        Self {
            system,
            messages,
            temperature: default_temperature(),
            response_schema: None,
        }
    }

    /// 从对话历史构建请求
    ///
    /// 对应工具调用已被淘汰的工具结果会被跳过；
    /// 显式给出系统提示时，历史中的系统消息也会跳过
    pub fn from_history<'a, I>(system: Option<String>, history: I) -> Self
    where
        I: IntoIterator<Item = &'a Message>,
    {
        let mut open_calls: Vec<&str> = Vec::new();
        let mut messages = Vec::new();
        for message in history {
            if message.role == MessageRole::System && system.is_some() {
                continue;
            }
            if message.is_tool_call() {
                if let Some(link) = &message.tool {
                    open_calls.push(link.call_id.as_str());
                }
            }
            if message.role == MessageRole::Tool {
                let linked = message
                    .tool
                    .as_ref()
                    .map(|link| open_calls.contains(&link.call_id.as_str()))
                    .unwrap_or(false);
                if !linked {
                    continue;
                }
            }
            messages.push(LlmMessage::from(message));
        }
        Self::new(system, messages)
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_response_schema(mut self, schema: Value) -> Self {
        self.response_schema = Some(schema);
        self
    }

    pub fn last_user_content(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::User)
            .map(|m| m.content.as_str())
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u64, completion_tokens: u64, total_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens,
        }
    }

    /// 由两部分计算 `total_tokens`
    pub fn from_counts(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self::new(prompt_tokens, completion_tokens, prompt_tokens + completion_tokens)
    }

    pub fn is_zero(&self) -> bool {
        self.total_tokens == 0 && self.prompt_tokens == 0 && self.completion_tokens == 0
    }
}

impl AddAssign for TokenUsage {
    fn add_assign(&mut self, rhs: Self) {
        self.prompt_tokens += rhs.prompt_tokens;
        self.completion_tokens += rhs.completion_tokens;
        self.total_tokens += rhs.total_tokens;
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LlmResponse {
    pub content: String,
    #[serde(default)]
    pub usage: TokenUsage,
}

impl LlmResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            usage: TokenUsage::default(),
        }
    }

    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = usage;
        self
    }
}
