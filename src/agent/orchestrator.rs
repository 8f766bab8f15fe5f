use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{QuestFlowError, Result};
use crate::events::{tracing_sink, DynEventSink};
use crate::llm::{DynLlmClient, UsageLedger};
use crate::tools::{Tool, ToolInvocation, ToolManifest, ToolRegistry};

use super::dispatch::{Agent, AgentConfig, DynAgent, ToolDispatchAgent};
use super::message::Message;

/// 把子 Agent 暴露为父 Agent 的工具
///
/// 唯一的字符串参数拼进指令交给子 Agent 的 `process_message`，
/// 子 Agent 的回复即工具结果
pub struct ChildAgentTool {
    manifest: ToolManifest,
    parameter: String,
    instruction: String,
    child: DynAgent,
}

impl ChildAgentTool {
    pub fn new(name: impl Into<String>, description: impl Into<String>, child: DynAgent) -> Self {
        Self::with_parameter(name, description, "request", "what you need from this specialist", child)
    }

    pub fn with_parameter(
        name: impl Into<String>,
        description: impl Into<String>,
        parameter: &str,
        parameter_description: &str,
        child: DynAgent,
    ) -> Self {
        let manifest = ToolManifest::builder(name)
            .description(description)
            .string_param(parameter, parameter_description)
            .build();
        Self {
            manifest,
            parameter: parameter.to_string(),
            instruction: "The orchestrator asks:".to_string(),
            child,
        }
    }

    pub fn instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = instruction.into();
        self
    }

    pub fn child(&self) -> &DynAgent {
        &self.child
    }

    fn synthesize(&self, value: &str) -> String {
        format!("{}\n{}: {}", self.instruction, self.parameter, value)
    }
}

#[async_trait]
impl Tool for ChildAgentTool {
    fn manifest(&self) -> &ToolManifest {
        &self.manifest
    }

    async fn call(&self, invocation: ToolInvocation) -> Result<Value> {
        let value = invocation
            .params
            .get(&self.parameter)
            .and_then(Value::as_str)
            .ok_or_else(|| QuestFlowError::InvalidParameters {
                tool: self.manifest.name.clone(),
                message: format!("missing string `{}`", self.parameter),
            })?;
        let reply = self.child.process_message(&self.synthesize(value)).await;
        Ok(Value::String(reply))
    }
}

/// 层级编排者：工具即委派给子 Agent
///
/// 每次调用都重新汇总根与所有子 Agent 的用量，
/// 因此总能反映子 Agent 的最新累计
pub struct HierarchicalOrchestrator {
    root: ToolDispatchAgent,
    children: Vec<DynAgent>,
}

impl HierarchicalOrchestrator {
    pub fn builder(config: AgentConfig, client: DynLlmClient) -> OrchestratorBuilder {
        OrchestratorBuilder {
            config,
            client,
            sink: tracing_sink(),
            delegates: Vec::new(),
            tools: Vec::new(),
        }
    }

    pub fn root(&self) -> &ToolDispatchAgent {
        &self.root
    }

    pub fn children(&self) -> &[DynAgent] {
        &self.children
    }

    /// 仅编排者自身模型调用的用量
    pub fn own_usage(&self) -> UsageLedger {
        self.root.usage()
    }
}

#[async_trait]
impl Agent for HierarchicalOrchestrator {
    fn name(&self) -> &str {
        self.root.name()
    }

    async fn process_message(&self, message: &str) -> String {
        self.root.process_message(message).await
    }

    fn usage(&self) -> UsageLedger {
        let mut total = self.root.usage();
        for child in &self.children {
            total.merge(&child.usage());
        }
        total
    }

    fn history(&self) -> Vec<Message> {
        self.root.history()
    }

    fn model_failure(&self) -> Option<String> {
        self.root.model_failure()
    }
}

pub struct OrchestratorBuilder {
    config: AgentConfig,
    client: DynLlmClient,
    sink: DynEventSink,
    delegates: Vec<ChildAgentTool>,
    tools: Vec<Arc<dyn Tool>>,
}

impl OrchestratorBuilder {
    pub fn sink(mut self, sink: DynEventSink) -> Self {
        self.sink = sink;
        self
    }

    pub fn child(
        mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        agent: DynAgent,
    ) -> Self {
        self.delegates.push(ChildAgentTool::new(name, description, agent));
        self
    }

    pub fn delegate(mut self, tool: ChildAgentTool) -> Self {
        self.delegates.push(tool);
        self
    }

    /// `game` 工具经由持有会话的专属子 Agent
    pub fn game_interface(mut self, agent: DynAgent) -> Self {
        let tool = ChildAgentTool::with_parameter(
            "game",
            "Play a command in the game through the game interface agent and get the game's output.",
            "command",
            "the exact command to type into the game",
            agent,
        )
        .instruction("Send this command to the game with send_command and report the game's output verbatim.");
        self.delegates.push(tool);
        self
    }

    /// 由编排者自己处理的普通工具
    pub fn tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn build(self) -> Result<HierarchicalOrchestrator> {
        let mut registry = ToolRegistry::new();
        let mut children = Vec::with_capacity(self.delegates.len());
        for delegate in self.delegates {
            children.push(Arc::clone(delegate.child()));
            registry.register(Arc::new(delegate))?;
        }
        for tool in self.tools {
            registry.register(tool)?;
        }
        let root = ToolDispatchAgent::new(self.config, self.client, registry)?.with_sink(self.sink);
        Ok(HierarchicalOrchestrator { root, children })
    }
}
