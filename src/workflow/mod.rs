//! 工作流模块
//!
//! `TurnWorkflow` 驱动单个游戏会话，`WorkflowRunner` 顺序或分批并发地运行多个工作流。

pub mod compare;
pub mod result;
pub mod runner;
pub mod strategy;
pub mod turn;

pub use compare::{
    best_score, best_score_per_cost, best_score_per_move, best_score_per_token, fastest,
    summary_table, ComparisonReport,
};
pub use result::{TurnRecord, WorkflowResult, WorkflowState};
pub use runner::{total_elapsed, ExecutionMode, WorkflowRunner};
pub use strategy::{
    normalize_command, AgentStrategy, DecisionStrategy, DirectStrategy, FnStrategy,
    StrategyFactory,
};
pub use turn::{TurnWorkflow, WorkflowConfig, DEFAULT_MAX_ITERATIONS, DEFAULT_SETUP_COMMAND};
