use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::llm::UsageLedger;

/// 工作流运行的生命周期
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    #[default]
    NotStarted,
    Running,
    Completed,
    TimedOut,
    Failed,
}

impl WorkflowState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            WorkflowState::Completed | WorkflowState::TimedOut | WorkflowState::Failed
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowState::NotStarted => "not_started",
            WorkflowState::Running => "running",
            WorkflowState::Completed => "completed",
            WorkflowState::TimedOut => "timed_out",
            WorkflowState::Failed => "failed",
        }
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// 一次命令/回应
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnRecord {
    pub turn: u32,
    pub command: String,
    pub response: String,
    pub score: Option<u32>,
    pub moves: Option<u32>,
    pub terminated: bool,
}

/// 工作流运行的最终报告
///
/// 失败的运行也会产生报告：分数和步数为 0，`completed == false`，
/// 错误文本保存在 `error` 中
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkflowResult {
    pub name: String,
    pub display: String,
    pub state: WorkflowState,
    pub score: u32,
    pub moves: u32,
    pub completed: bool,
    pub turns: u32,
    #[serde(with = "duration_secs")]
    pub elapsed: Duration,
    pub usage: UsageLedger,
    pub estimated_cost: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WorkflowResult {
    /// 运行中断时上报的结果
    pub fn degraded(
        name: impl Into<String>,
        display: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            display: display.into(),
            state: WorkflowState::Failed,
            score: 0,
            moves: 0,
            completed: false,
            turns: 0,
            elapsed: Duration::ZERO,
            usage: UsageLedger::new(),
            estimated_cost: 0.0,
            error: Some(error.into()),
        }
    }

    pub fn total_tokens(&self) -> u64 {
        self.usage.total().total_tokens
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs.max(0.0)).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degraded_result_reports_nothing_achieved() {
        let result = WorkflowResult::degraded("zork-agent", "agent", "boom");
        assert_eq!(result.state, WorkflowState::Failed);
        assert_eq!((result.score, result.moves, result.completed), (0, 0, false));
        assert_eq!(result.total_tokens(), 0);
    }

    #[test]
    fn serializes_elapsed_as_seconds() {
        let mut result = WorkflowResult::degraded("a", "b", "c");
        result.elapsed = Duration::from_millis(1500);
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["elapsed"], 1.5);
        assert_eq!(value["state"], "failed");
    }

    #[test]
    fn oversized_elapsed_is_rejected_not_panicking() {
        let mut value = serde_json::to_value(WorkflowResult::degraded("a", "b", "c")).unwrap();
        value["elapsed"] = serde_json::json!(1e30);
        assert!(serde_json::from_value::<WorkflowResult>(value.clone()).is_err());
        value["elapsed"] = serde_json::json!(2.25);
        let parsed: WorkflowResult = serde_json::from_value(value).unwrap();
        assert_eq!(parsed.elapsed, Duration::from_millis(2250));
    }
}
