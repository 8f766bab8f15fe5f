use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::{QuestFlowError, Result};
use crate::state::ContextStore;

use super::manifest::ToolManifest;
use super::tool::{Tool, ToolInvocation};

fn string_param<'a>(tool: &str, params: &'a Value, key: &str) -> Result<&'a str> {
    params
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| QuestFlowError::InvalidParameters {
            tool: tool.to_string(),
            message: format!("missing string `{key}`"),
        })
}

/// 按主题记录笔记
pub struct RememberTool {
    manifest: ToolManifest,
    store: Arc<dyn ContextStore>,
}

impl RememberTool {
    pub fn new(store: Arc<dyn ContextStore>) -> Self {
        Self {
            manifest: ToolManifest::builder("remember")
                .description("Save a note about the game under a short topic key.")
                .string_param("topic", "short key such as a room, item or puzzle name")
                .string_param("note", "what to remember")
                .build(),
            store,
        }
    }
}

#[async_trait]
impl Tool for RememberTool {
    fn manifest(&self) -> &ToolManifest {
        &self.manifest
    }

    async fn call(&self, invocation: ToolInvocation) -> Result<Value> {
        let topic = string_param(self.name(), &invocation.params, "topic")?;
        let note = string_param(self.name(), &invocation.params, "note")?;
        let merged = match self.store.get(topic).await? {
            Some(existing) => format!("{existing}\n{note}"),
            None => note.to_string(),
        };
        self.store.set(topic, merged).await?;
        Ok(json!({ "saved": topic }))
    }
}

/// 读取某主题的笔记，或列出已有主题
pub struct RecallTool {
    manifest: ToolManifest,
    store: Arc<dyn ContextStore>,
}

impl RecallTool {
    pub fn new(store: Arc<dyn ContextStore>) -> Self {
        Self {
            manifest: ToolManifest::builder("recall")
                .description("Read saved notes for a topic. Use topic \"*\" to list all topics.")
                .string_param("topic", "topic key, or * for the list of topics")
                .build(),
            store,
        }
    }
}

#[async_trait]
impl Tool for RecallTool {
    fn manifest(&self) -> &ToolManifest {
        &self.manifest
    }

    async fn call(&self, invocation: ToolInvocation) -> Result<Value> {
        let topic = string_param(self.name(), &invocation.params, "topic")?;
        if topic == "*" {
            return Ok(json!({ "topics": self.store.keys().await? }));
        }
        let notes = self.store.get(topic).await?;
        Ok(json!({ "topic": topic, "notes": notes }))
    }
}
