use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::error::{QuestFlowError, Result};
use crate::events::{tracing_sink, DynEventSink, FlowEvent};
use crate::llm::{DynLlmClient, LlmRequest, UsageLedger};
use crate::tools::{ToolInvocation, ToolRegistry};

use super::decision::{Decision, DecisionSchema, RESPOND_ACTION};
use super::dialogue::BoundedDialogue;
use super::message::{Message, MessageRole, ToolLink};

/// Agent trait：把消息变成回复，并报告用量
#[async_trait]
pub trait Agent: Send + Sync {
    fn name(&self) -> &str;

    /// 不会失败：模型和工具错误以合成回复返回
    async fn process_message(&self, message: &str) -> String;

    /// 累计用量，包含所有被委派的子 Agent
    fn usage(&self) -> UsageLedger;

    fn history(&self) -> Vec<Message>;

    /// 最近一次消息处理中模型调用失败的原因；回复此时只是错误文本
    fn model_failure(&self) -> Option<String> {
        None
    }
}

/// Agent 配置
#[derive(Clone, Debug)]
pub struct AgentConfig {
    pub name: String,
    pub system_prompt: String,
    pub dialogue_capacity: usize,
    pub temperature: f32,
}

impl AgentConfig {
    pub fn new(name: impl Into<String>, system_prompt: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            system_prompt: system_prompt.into(),
            dialogue_capacity: 40,
            temperature: 0.2,
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.dialogue_capacity = capacity;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// 每条消息直接回答，或恰好调用一个工具
pub struct ToolDispatchAgent {
    config: AgentConfig,
    client: DynLlmClient,
    tools: ToolRegistry,
    decision: DecisionSchema,
    dialogue: Mutex<BoundedDialogue>,
    usage: Mutex<UsageLedger>,
    failure: Mutex<Option<String>>,
    turn: tokio::sync::Mutex<()>,
    sink: DynEventSink,
}

impl ToolDispatchAgent {
    pub fn new(config: AgentConfig, client: DynLlmClient, tools: ToolRegistry) -> Result<Self> {
        if tools.get(RESPOND_ACTION).is_some() {
            return Err(QuestFlowError::Config(format!(
                "agent `{}`: `{RESPOND_ACTION}` is reserved and cannot name a tool",
                config.name
            )));
        }
        let decision = DecisionSchema::from_registry(&tools);
        let dialogue = BoundedDialogue::new(config.dialogue_capacity, config.system_prompt.as_str());
        Ok(Self {
            config,
            client,
            tools,
            decision,
            dialogue: Mutex::new(dialogue),
            usage: Mutex::new(UsageLedger::new()),
            failure: Mutex::new(None),
            turn: tokio::sync::Mutex::new(()),
            sink: tracing_sink(),
        })
    }

    pub fn with_sink(mut self, sink: DynEventSink) -> Self {
        self.sink = sink;
        self
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn decision_schema(&self) -> &DecisionSchema {
        &self.decision
    }

    pub fn model(&self) -> &str {
        self.client.model()
    }

    fn append(&self, message: Message) {
        self.dialogue.lock().push(message);
    }

    fn reply(&self, text: String) -> String {
        self.append(Message::assistant(text.as_str()));
        text
    }

    /// 把可恢复的错误变成助手回复
    fn recover(&self, stage: &str, error: QuestFlowError) -> String {
        warn!(agent = %self.config.name, stage, error = %error, "recovering from agent error");
        self.reply(format!("Error during {stage}: {error}"))
    }

    async fn generate(&self, response_schema: Option<Value>) -> Result<String> {
        let mut request = {
            let dialogue = self.dialogue.lock();
            LlmRequest::from_history(Some(self.config.system_prompt.clone()), dialogue.messages())
        }
        .with_temperature(self.config.temperature);
        if let Some(schema) = response_schema {
            request = request.with_response_schema(schema);
        }

        let response = match self.client.complete(request).await {
            Ok(response) => response,
            Err(error) => {
                *self.failure.lock() = Some(error.to_string());
                return Err(error);
            }
        };
        let model = self.client.model().to_string();
        self.usage.lock().record(&model, response.usage);
        self.sink.emit(FlowEvent::UsageRecorded {
            agent: self.config.name.clone(),
            model,
            usage: response.usage,
        });
        Ok(response.content)
    }

    async fn invoke(&self, tool: String, params: Value) -> String {
        let Some(handler) = self.tools.get(&tool) else {
            let error = QuestFlowError::ToolNotRegistered(tool.clone());
            warn!(agent = %self.config.name, tool = %tool, "model selected an unknown tool");
            self.sink.emit(FlowEvent::ToolFailed {
                agent: self.config.name.clone(),
                tool,
                error: error.to_string(),
            });
            return self.reply(format!(
                "Error: {error} (known tools: {}).",
                self.tools.names().join(", ")
            ));
        };

        let invocation = ToolInvocation::new(tool.as_str(), params.clone());
        let link = ToolLink::new(tool.as_str(), invocation.call_id.as_str());
        self.append(Message::tool_call(
            link.clone(),
            json!({ "action": tool, "params": params }),
        ));
        self.sink.emit(FlowEvent::ToolInvoked {
            agent: self.config.name.clone(),
            tool: tool.clone(),
            call_id: invocation.call_id.clone(),
        });

        match handler.call(invocation).await {
            Ok(output) => {
                self.append(Message::tool_result(link, output));
                match self.generate(None).await {
                    Ok(text) => self.reply(text),
                    Err(error) => self.recover("final reply", error),
                }
            }
            Err(error) => {
                self.sink.emit(FlowEvent::ToolFailed {
                    agent: self.config.name.clone(),
                    tool: tool.clone(),
                    error: error.to_string(),
                });
                self.reply(format!("Error: tool `{tool}` failed: {error}"))
            }
        }
    }
}

#[async_trait]
impl Agent for ToolDispatchAgent {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn process_message(&self, message: &str) -> String {
        let _turn = self.turn.lock().await;
        *self.failure.lock() = None;
        self.append(Message::new(MessageRole::User, message));

        if self.tools.is_empty() {
            return match self.generate(None).await {
                Ok(text) => self.reply(text),
                Err(error) => self.recover("generation", error),
            };
        }

        let raw = match self.generate(Some(self.decision.to_json_schema())).await {
            Ok(raw) => raw,
            Err(error) => return self.recover("decision", error),
        };
        match self.decision.parse(&raw) {
            Ok(Decision::Respond { reply }) => {
                debug!(agent = %self.config.name, "answered directly");
                self.reply(reply)
            }
            Ok(Decision::Invoke { tool, params }) => self.invoke(tool, params).await,
            Err(error) => self.recover("decision", error),
        }
    }

    fn usage(&self) -> UsageLedger {
        self.usage.lock().clone()
    }

    fn history(&self) -> Vec<Message> {
        self.dialogue.lock().to_vec()
    }

    fn model_failure(&self) -> Option<String> {
        self.failure.lock().clone()
    }
}

impl std::fmt::Debug for ToolDispatchAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDispatchAgent")
            .field("name", &self.config.name)
            .field("model", &self.client.model())
            .field("tools", &self.tools.names())
            .finish()
    }
}

pub type DynAgent = Arc<dyn Agent>;
