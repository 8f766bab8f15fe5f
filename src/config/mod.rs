pub mod assemble;
pub mod env;
pub mod run;

pub use assemble::{build_workflows, llm_client, price_table, strategy_factory};
pub use env::EnvConfig;
pub use run::{RunConfig, RunMode, StrategyKind, WorkflowDefinition};
