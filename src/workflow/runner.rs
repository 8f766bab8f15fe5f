use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::future::join_all;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{error, info};

use crate::error::{QuestFlowError, Result};
use crate::events::{tracing_sink, DynEventSink, FlowEvent};

use super::result::WorkflowResult;
use super::turn::TurnWorkflow;

/// 执行模式
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ExecutionMode {
    #[default]
    Sequential,
    /// `concurrency == 0` 表示所有工作流在同一批运行
    Parallel { concurrency: usize },
}

impl ExecutionMode {
    fn batch_size(self, total: usize) -> usize {
        match self {
            ExecutionMode::Sequential => 1,
            ExecutionMode::Parallel { concurrency } if concurrency == 0 || concurrency >= total => {
                total
            }
            ExecutionMode::Parallel { concurrency } => concurrency,
        }
    }
}

/// Runs a set of workflows and keeps their results in input order.
pub struct WorkflowRunner {
    mode: ExecutionMode,
    workflows: Vec<TurnWorkflow>,
    sink: DynEventSink,
}

impl WorkflowRunner {
    pub fn new(mode: ExecutionMode, workflows: Vec<TurnWorkflow>) -> Result<Self> {
        if workflows.is_empty() {
            return Err(QuestFlowError::Config("no workflows selected".into()));
        }
        Ok(Self {
            mode,
            workflows,
            sink: tracing_sink(),
        })
    }

    pub fn with_sink(mut self, sink: DynEventSink) -> Self {
        self.sink = sink;
        self
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    pub fn workflows(&self) -> &[TurnWorkflow] {
        &self.workflows
    }

    /// 每个工作流运行一次
    ///
    /// 批次依次执行，批内工作流在当前任务上并发运行；
    /// panic 的工作流得到降级结果，不影响同批其他工作流
    pub async fn run(&mut self) -> Vec<WorkflowResult> {
        let size = self.mode.batch_size(self.workflows.len()).max(1);
        let mut results = Vec::with_capacity(self.workflows.len());
        info!(
            workflows = self.workflows.len(),
            batch_size = size,
            mode = ?self.mode,
            "starting workflow run"
        );

        for (batch, chunk) in self.workflows.chunks_mut(size).enumerate() {
            self.sink.emit(FlowEvent::BatchStarted {
                batch,
                size: chunk.len(),
            });
            let runs = chunk.iter_mut().map(|workflow| async move {
                let started = Instant::now();
                let outcome = AssertUnwindSafe(workflow.run()).catch_unwind().await;
                (outcome, started.elapsed())
            });
            let finished = join_all(runs).await;

            for (workflow, (outcome, elapsed)) in chunk.iter_mut().zip(finished) {
                let result = match outcome {
                    Ok(result) => result,
                    Err(panic) => {
                        let message = panic_message(panic.as_ref());
                        error!(workflow = %workflow.name(), panic = %message, "workflow panicked");
                        workflow.mark_failed();
                        self.sink.emit(FlowEvent::WorkflowFailed {
                            workflow: workflow.name().to_string(),
                            error: message.clone(),
                        });
                        WorkflowResult::degraded(
                            workflow.config().name.as_str(),
                            workflow.config().display.as_str(),
                            message,
                        )
                    }
                };
                results.push(WorkflowResult { elapsed, ..result });
            }
            self.sink.emit(FlowEvent::BatchFinished { batch });
        }
        results
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        format!("panicked: {text}")
    } else if let Some(text) = payload.downcast_ref::<String>() {
        format!("panicked: {text}")
    } else {
        "panicked".to_string()
    }
}

/// 各工作流耗时之和
pub fn total_elapsed(results: &[WorkflowResult]) -> Duration {
    results.iter().map(|r| r.elapsed).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_size_follows_mode() {
        assert_eq!(ExecutionMode::Sequential.batch_size(3), 1);
        assert_eq!(ExecutionMode::Parallel { concurrency: 2 }.batch_size(3), 2);
        assert_eq!(ExecutionMode::Parallel { concurrency: 0 }.batch_size(3), 3);
        assert_eq!(ExecutionMode::Parallel { concurrency: 9 }.batch_size(3), 3);
    }

    #[test]
    fn empty_selection_is_a_configuration_error() {
        assert!(matches!(
            WorkflowRunner::new(ExecutionMode::Sequential, Vec::new()),
            Err(QuestFlowError::Config(_))
        ));
    }

    #[test]
    fn mode_deserializes_from_tagged_json() {
        let mode: ExecutionMode =
            serde_json::from_str(r#"{"mode":"parallel","concurrency":2}"#).unwrap();
        assert_eq!(mode, ExecutionMode::Parallel { concurrency: 2 });
    }
}
