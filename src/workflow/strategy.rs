use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use tracing::warn;

use crate::agent::{Agent, BoundedDialogue, DynAgent, MessageRole};
use crate::error::{QuestFlowError, Result};
use crate::game::SessionHandle;
use crate::llm::{DynLlmClient, LlmRequest, UsageLedger};

/// 根据工作流对话选择下一条游戏命令
#[async_trait]
pub trait DecisionStrategy: Send + Sync {
    async fn next_command(&mut self, dialogue: &BoundedDialogue) -> Result<String>;

    /// 迄今所有模型调用的用量，含子 Agent
    fn usage(&self) -> UsageLedger {
        UsageLedger::new()
    }
}

/// 会话建立后再创建策略，工具才能绑定会话
pub type StrategyFactory =
    Arc<dyn Fn(&SessionHandle) -> Result<Box<dyn DecisionStrategy>> + Send + Sync>;

/// 把模型输出归一化为单行命令
pub fn normalize_command(raw: &str) -> String {
    let line = raw
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or_default();
    let line = line.strip_prefix('>').unwrap_or(line).trim_start();
    line.trim_matches(|c: char| matches!(c, '"' | '\'' | '`'))
        .trim()
        .to_string()
}

/// 每回合对整段对话做一次自由文本调用
pub struct DirectStrategy {
    client: DynLlmClient,
    system_prompt: String,
    temperature: f32,
    usage: UsageLedger,
}

impl DirectStrategy {
    pub fn new(client: DynLlmClient, system_prompt: impl Into<String>) -> Self {
        Self {
            client,
            system_prompt: system_prompt.into(),
            temperature: 0.2,
            usage: UsageLedger::new(),
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

#[async_trait]
impl DecisionStrategy for DirectStrategy {
    async fn next_command(&mut self, dialogue: &BoundedDialogue) -> Result<String> {
        let request =
            LlmRequest::from_history(Some(self.system_prompt.clone()), dialogue.messages())
                .with_temperature(self.temperature);
        let response = self.client.complete(request).await?;
        self.usage.record(self.client.model(), response.usage);
        let command = normalize_command(&response.content);
        if command.is_empty() {
            return Err(QuestFlowError::Llm("model produced an empty command".into()));
        }
        Ok(command)
    }

    fn usage(&self) -> UsageLedger {
        self.usage.clone()
    }
}

/// 把最新的游戏文本交给 Agent，执行它给出的命令
///
/// Agent 维护自己的对话，工作流对话只提供最新观察；
/// Agent 的模型调用失败时返回错误，不把错误文本当命令发出
pub struct AgentStrategy {
    agent: DynAgent,
}

impl AgentStrategy {
    pub fn new(agent: DynAgent) -> Self {
        Self { agent }
    }

    pub fn agent(&self) -> &DynAgent {
        &self.agent
    }
}

#[async_trait]
impl DecisionStrategy for AgentStrategy {
    async fn next_command(&mut self, dialogue: &BoundedDialogue) -> Result<String> {
        let observation = dialogue
            .last_with_role(MessageRole::User)
            .map(|m| m.content.as_str())
            .unwrap_or_default();
        let reply = self.agent.process_message(observation).await;
        if let Some(failure) = self.agent.model_failure() {
            warn!(agent = %self.agent.name(), error = %failure, "agent could not reach its model");
            return Err(QuestFlowError::Llm(format!(
                "agent `{}`: {failure}",
                self.agent.name()
            )));
        }
        if reply.starts_with("Error") {
            warn!(agent = %self.agent.name(), reply = %reply, "agent answered with a recovered error");
        }
        let command = normalize_command(&reply);
        if command.is_empty() {
            return Err(QuestFlowError::Llm(format!(
                "agent `{}` produced an empty command",
                self.agent.name()
            )));
        }
        Ok(command)
    }

    fn usage(&self) -> UsageLedger {
        self.agent.usage()
    }
}

type CommandFn = Box<dyn FnMut(&BoundedDialogue) -> BoxFuture<'static, Result<String>> + Send + Sync>;

/// 由闭包实现的策略，用于脚本化游玩与测试
pub struct FnStrategy {
    decide: CommandFn,
}

impl FnStrategy {
    pub fn new<F, Fut>(mut decide: F) -> Self
    where
        F: FnMut(&BoundedDialogue) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<String>> + Send + 'static,
    {
        Self {
            decide: Box::new(move |dialogue| Box::pin(decide(dialogue))),
        }
    }

    /// 按顺序执行 `commands`，之后重复最后一条
    pub fn scripted<I, S>(commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let commands: Vec<String> = commands.into_iter().map(Into::into).collect();
        let mut next = 0usize;
        Self::new(move |_| {
            let command = commands
                .get(next.min(commands.len().saturating_sub(1)))
                .cloned()
                .unwrap_or_else(|| "look".to_string());
            next += 1;
            async move { Ok(command) }
        })
    }
}

#[async_trait]
impl DecisionStrategy for FnStrategy {
    async fn next_command(&mut self, dialogue: &BoundedDialogue) -> Result<String> {
        (self.decide)(dialogue).await
    }
}
