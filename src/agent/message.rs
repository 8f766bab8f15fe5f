use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Tool,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::Tool => "tool",
        }
    }
}

/// 工具调用关联信息
///
/// assistant 消息上表示一次工具选择，tool 消息上指向该次选择。
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolLink {
    pub tool: String,
    pub call_id: String,
}

impl ToolLink {
    pub fn new(tool: impl Into<String>, call_id: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            call_id: call_id.into(),
        }
    }
}

/// 写入对话前的内容，随后展平为文本
#[derive(Clone, Debug, PartialEq)]
pub enum MessageContent {
    Text(String),
    Structured(Value),
}

impl MessageContent {
    /// 结构化内容存为紧凑 JSON；`serde_json` 的对象键有序，
    /// 相等的值总序列化为相同文本
    pub fn into_text(self) -> String {
        match self {
            MessageContent::Text(text) => text,
            MessageContent::Structured(Value::String(text)) => text,
            MessageContent::Structured(value) => value.to_string(),
        }
    }
}

impl From<String> for MessageContent {
    fn from(value: String) -> Self {
        MessageContent::Text(value)
    }
}

impl From<&str> for MessageContent {
    fn from(value: &str) -> Self {
        MessageContent::Text(value.to_string())
    }
}

impl From<&String> for MessageContent {
    fn from(value: &String) -> Self {
        MessageContent::Text(value.clone())
    }
}

impl From<Value> for MessageContent {
    fn from(value: Value) -> Self {
        MessageContent::Structured(value)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub id: String,
    pub role: MessageRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<ToolLink>,
}

impl Message {
    pub fn new(role: MessageRole, content: impl Into<MessageContent>) -> Self {
        Self {
            id: uuid(),
            role,
            content: content.into().into_text(),
            tool: None,
        }
    }

    pub fn system(content: impl Into<MessageContent>) -> Self {
        Self::new(MessageRole::System, content)
    }

    pub fn user(content: impl Into<MessageContent>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<MessageContent>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    pub fn tool_call(link: ToolLink, content: impl Into<MessageContent>) -> Self {
        Self {
            tool: Some(link),
            ..Self::new(MessageRole::Assistant, content)
        }
    }

    pub fn tool_result(link: ToolLink, content: impl Into<MessageContent>) -> Self {
        Self {
            tool: Some(link),
            ..Self::new(MessageRole::Tool, content)
        }
    }

    pub fn is_tool_call(&self) -> bool {
        self.role == MessageRole::Assistant && self.tool.is_some()
    }
}

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

pub fn uuid() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};

    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("msg-{secs}-{seq}")
}
