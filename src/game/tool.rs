use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::{QuestFlowError, Result};
use crate::tools::{Tool, ToolInvocation, ToolManifest};

use super::patterns;
use super::session::SessionHandle;

/// 向绑定的游戏会话发送一条命令
///
/// 返回 `{ "output": <游戏文本>, "game_over": <bool> }`
pub struct SendCommandTool {
    manifest: ToolManifest,
    session: SessionHandle,
}

impl SendCommandTool {
    pub fn new(session: SessionHandle) -> Self {
        Self {
            manifest: ToolManifest::builder("send_command")
                .description("Type a command into the running text adventure and read its output.")
                .string_param("command", "the exact command to type, e.g. `open mailbox`")
                .build(),
            session,
        }
    }
}

#[async_trait]
impl Tool for SendCommandTool {
    fn manifest(&self) -> &ToolManifest {
        &self.manifest
    }

    async fn call(&self, invocation: ToolInvocation) -> Result<Value> {
        let command = invocation
            .params
            .get("command")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| QuestFlowError::InvalidParameters {
                tool: self.manifest.name.clone(),
                message: "`command` must be a non-empty string".into(),
            })?;
        let output = self.session.send(command).await;
        let game_over = patterns::is_game_over(&output);
        Ok(json!({ "output": output, "game_over": game_over }))
    }
}
