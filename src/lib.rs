pub mod agent;
pub mod config;
pub mod error;
pub mod events;
pub mod game;
pub mod llm;
pub mod schema;
pub mod state;
pub mod tools;
pub mod utils;
pub mod workflow;

pub use agent::{
    Agent, AgentConfig, BoundedDialogue, ChildAgentTool, Decision, DecisionSchema, DynAgent,
    HierarchicalOrchestrator, Message, MessageRole, OrchestratorBuilder, ToolDispatchAgent,
};
pub use config::{EnvConfig, RunConfig, StrategyKind, WorkflowDefinition};
pub use error::{QuestFlowError, Result};
pub use events::{DynEventSink, EventSink, FlowEvent, MemorySink, TracingSink};
pub use game::{DynGameClient, GameSessionClient, SessionHandle, SessionStart};
#[cfg(feature = "game-http")]
pub use game::HttpGameClient;
#[cfg(feature = "openai-client")]
pub use llm::GenericHttpClient;
pub use llm::{
    DynLlmClient, LlmClient, LlmRequest, LlmResponse, LocalEchoClient, ModelPrice, PriceTable,
    RetryPolicy, RetryingClient, TokenUsage, UsageLedger,
};
pub use schema::{Schema, SchemaKind};
pub use state::{ContextStore, MemoryStore};
pub use tools::{FnTool, Tool, ToolInvocation, ToolManifest, ToolRegistry};
pub use utils::{logging, validation};
pub use workflow::{
    ComparisonReport, DecisionStrategy, ExecutionMode, StrategyFactory, TurnRecord, TurnWorkflow,
    WorkflowConfig, WorkflowResult, WorkflowRunner, WorkflowState,
};
