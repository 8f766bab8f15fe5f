use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{QuestFlowError, Result};
use crate::llm::PriceTable;
use crate::utils::ConfigValidator;
use crate::workflow::{ExecutionMode, DEFAULT_MAX_ITERATIONS};

fn default_max_iterations() -> u32 {
    DEFAULT_MAX_ITERATIONS
}

fn default_dialogue_capacity() -> usize {
    40
}

fn default_temperature() -> f32 {
    0.2
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    #[default]
    Sequential,
    Parallel,
}

/// 工作流选择命令的方式
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// 每回合一次模型调用
    Direct,
    /// 带笔记本的工具调度 Agent
    Agent,
    /// 委派给专职 Agent 的编排者
    Hierarchical,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            StrategyKind::Direct => "direct",
            StrategyKind::Agent => "agent",
            StrategyKind::Hierarchical => "hierarchical",
        })
    }
}

/// 工作流定义
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    pub name: String,
    pub strategy: StrategyKind,
    pub model: String,
    /// OpenAI 兼容的 chat completions 地址；缺省时使用离线 echo 客户端
    #[serde(default)]
    pub endpoint: Option<String>,
    /// 字面 key 或 `${ENV_VAR}`
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub dialogue_capacity: Option<usize>,
    #[serde(default)]
    pub max_iterations: Option<u32>,
}

impl WorkflowDefinition {
    pub fn display(&self) -> String {
        format!("{}/{}", self.strategy, self.model)
    }
}

/// 运行配置
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub game_url: String,
    pub game: String,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    #[serde(default)]
    pub mode: RunMode,
    /// 并行模式的批大小；0 表示全部同时运行
    #[serde(default)]
    pub concurrency: usize,
    #[serde(default = "default_dialogue_capacity")]
    pub dialogue_capacity: usize,
    /// 合并到内置价格表之上
    #[serde(default)]
    pub prices: PriceTable,
    pub workflows: Vec<WorkflowDefinition>,
}

impl RunConfig {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            QuestFlowError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let config: RunConfig = serde_json::from_str(raw)
            .map_err(|e| QuestFlowError::Config(format!("invalid run config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        ConfigValidator::validate_url(&self.game_url)?;
        if self.game.trim().is_empty() {
            return Err(QuestFlowError::Config("`game` must not be empty".into()));
        }
        if self.max_iterations == 0 {
            return Err(QuestFlowError::Config("`max_iterations` must be at least 1".into()));
        }
        let mut seen = HashSet::new();
        for workflow in &self.workflows {
            ConfigValidator::validate_workflow_name(&workflow.name)?;
            ConfigValidator::validate_model_name(&workflow.model)?;
            ConfigValidator::validate_temperature(workflow.temperature)?;
            if let Some(endpoint) = &workflow.endpoint {
                ConfigValidator::validate_url(endpoint)?;
            }
            if !seen.insert(workflow.name.as_str()) {
                return Err(QuestFlowError::Config(format!(
                    "workflow `{}` is defined twice",
                    workflow.name
                )));
            }
        }
        Ok(())
    }

    pub fn execution_mode(&self) -> ExecutionMode {
        match self.mode {
            RunMode::Sequential => ExecutionMode::Sequential,
            RunMode::Parallel => ExecutionMode::Parallel {
                concurrency: self.concurrency,
            },
        }
    }

    /// 按配置顺序返回 `only` 中点名的工作流；`only` 为空时返回全部
    pub fn select(&self, only: &[String]) -> Result<Vec<&WorkflowDefinition>> {
        if let Some(unknown) = only
            .iter()
            .find(|name| !self.workflows.iter().any(|w| &w.name == *name))
        {
            return Err(QuestFlowError::Config(format!("unknown workflow `{unknown}`")));
        }
        let selected: Vec<_> = self
            .workflows
            .iter()
            .filter(|w| only.is_empty() || only.contains(&w.name))
            .collect();
        if selected.is_empty() {
            return Err(QuestFlowError::Config("no workflows selected".into()));
        }
        Ok(selected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "game_url": "http://localhost:8000",
        "game": "zork1",
        "mode": "parallel",
        "concurrency": 2,
        "workflows": [
            {"name": "direct-mini", "strategy": "direct", "model": "gpt-4o-mini"},
            {"name": "team", "strategy": "hierarchical", "model": "gpt-4o", "temperature": 0.5}
        ]
    }"#;

    #[test]
    fn applies_defaults() {
        let config = RunConfig::from_json(SAMPLE).unwrap();
        assert_eq!(config.max_iterations, 100);
        assert_eq!(config.dialogue_capacity, 40);
        assert_eq!(config.execution_mode(), ExecutionMode::Parallel { concurrency: 2 });
        assert_eq!(config.workflows[0].temperature, 0.2);
        assert_eq!(config.workflows[1].display(), "hierarchical/gpt-4o");
    }

    #[test]
    fn selection_keeps_config_order_and_rejects_unknown_names() {
        let config = RunConfig::from_json(SAMPLE).unwrap();
        let picked = config
            .select(&["team".to_string(), "direct-mini".to_string()])
            .unwrap();
        assert_eq!(picked[0].name, "direct-mini");
        assert!(config.select(&["nope".to_string()]).is_err());
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let raw = SAMPLE.replace("\"team\"", "\"direct-mini\"");
        assert!(matches!(
            RunConfig::from_json(&raw),
            Err(QuestFlowError::Config(message)) if message.contains("twice")
        ));
    }
}
