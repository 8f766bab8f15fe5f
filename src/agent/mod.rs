pub mod builtin;
pub mod decision;
pub mod dialogue;
pub mod dispatch;
pub mod message;
pub mod orchestrator;

pub use builtin::{child_agent, standard_orchestrator, BuiltinRole, TeamSettings};
pub use decision::{Decision, DecisionSchema, DecisionVariant, RESPOND_ACTION};
pub use dialogue::BoundedDialogue;
pub use dispatch::{Agent, AgentConfig, DynAgent, ToolDispatchAgent};
pub use message::{uuid, Message, MessageContent, MessageRole, ToolLink};
pub use orchestrator::{ChildAgentTool, HierarchicalOrchestrator, OrchestratorBuilder};
