// 事件观察模块
//
// 核心组件只向注入的 `EventSink` 发送结构化事件，不关心事件写到哪里。

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::llm::TokenUsage;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FlowEvent {
    WorkflowStarted {
        workflow: String,
        game: String,
    },
    TurnCompleted {
        workflow: String,
        turn: u32,
        command: String,
        score: Option<u32>,
        moves: Option<u32>,
        terminated: bool,
    },
    WorkflowFinished {
        workflow: String,
        state: String,
        score: u32,
        moves: u32,
        turns: u32,
    },
    WorkflowFailed {
        workflow: String,
        error: String,
    },
    BatchStarted {
        batch: usize,
        size: usize,
    },
    BatchFinished {
        batch: usize,
    },
    ToolInvoked {
        agent: String,
        tool: String,
        call_id: String,
    },
    ToolFailed {
        agent: String,
        tool: String,
        error: String,
    },
    UsageRecorded {
        agent: String,
        model: String,
        usage: TokenUsage,
    },
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: FlowEvent);
}

pub type DynEventSink = Arc<dyn EventSink>;

/// 把事件转发给 `tracing`
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: FlowEvent) {
        match event {
            FlowEvent::WorkflowStarted { workflow, game } => {
                info!(workflow = %workflow, game = %game, "workflow started")
            }
            FlowEvent::TurnCompleted {
                workflow,
                turn,
                command,
                score,
                moves,
                terminated,
            } => info!(
                workflow = %workflow,
                turn,
                command = %command,
                ?score,
                ?moves,
                terminated,
                "turn completed"
            ),
            FlowEvent::WorkflowFinished {
                workflow,
                state,
                score,
                moves,
                turns,
            } => info!(
                workflow = %workflow,
                state = %state,
                score,
                moves,
                turns,
                "workflow finished"
            ),
            FlowEvent::WorkflowFailed { workflow, error } => {
                warn!(workflow = %workflow, error = %error, "workflow failed")
            }
            FlowEvent::BatchStarted { batch, size } => info!(batch, size, "batch started"),
            FlowEvent::BatchFinished { batch } => info!(batch, "batch finished"),
            FlowEvent::ToolInvoked {
                agent,
                tool,
                call_id,
            } => debug!(agent = %agent, tool = %tool, call_id = %call_id, "tool invoked"),
            FlowEvent::ToolFailed { agent, tool, error } => {
                warn!(agent = %agent, tool = %tool, error = %error, "tool failed")
            }
            FlowEvent::UsageRecorded {
                agent,
                model,
                usage,
            } => debug!(
                agent = %agent,
                model = %model,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "usage recorded"
            ),
        }
    }
}

/// 在内存中保留所有事件
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<FlowEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<FlowEvent> {
        self.events.lock().clone()
    }

    pub fn count<F>(&self, predicate: F) -> usize
    where
        F: Fn(&FlowEvent) -> bool,
    {
        self.events.lock().iter().filter(|e| predicate(e)).count()
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: FlowEvent) {
        self.events.lock().push(event);
    }
}

pub fn tracing_sink() -> DynEventSink {
    Arc::new(TracingSink)
}
