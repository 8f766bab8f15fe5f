use std::sync::Arc;

use crate::error::Result;
use crate::events::DynEventSink;
use crate::game::{SendCommandTool, SessionHandle};
use crate::llm::DynLlmClient;
use crate::state::ContextStore;
use crate::tools::{RecallTool, RememberTool, ToolRegistry};

use super::dispatch::{AgentConfig, DynAgent, ToolDispatchAgent};
use super::orchestrator::HierarchicalOrchestrator;

const ORCHESTRATOR_PROMPT: &str = "You are playing a text adventure. Each message is the latest game output. \
Consult your specialists when useful, then use the `game` tool to play exactly one command. \
After the game answers, reply with the exact command you played and nothing else.";

/// 内置子智能体角色
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuiltinRole {
    WorldState,
    Objectives,
    Memory,
    Puzzles,
    GameInterface,
}

impl BuiltinRole {
    /// 编排者咨询的角色；游戏接口单独接线
    pub const ADVISORS: [BuiltinRole; 4] = [
        BuiltinRole::WorldState,
        BuiltinRole::Objectives,
        BuiltinRole::Memory,
        BuiltinRole::Puzzles,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BuiltinRole::WorldState => "world_state",
            BuiltinRole::Objectives => "objectives",
            BuiltinRole::Memory => "memory",
            BuiltinRole::Puzzles => "puzzles",
            BuiltinRole::GameInterface => "game_interface",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            BuiltinRole::WorldState => {
                "Tracks rooms, exits, items and the player's inventory. Ask it where things are."
            }
            BuiltinRole::Objectives => {
                "Keeps the list of current goals and suggests what to pursue next."
            }
            BuiltinRole::Memory => "Saves and recalls notes about anything seen so far.",
            BuiltinRole::Puzzles => {
                "Tracks unsolved puzzles, obstacles and ideas that have already been tried."
            }
            BuiltinRole::GameInterface => "Sends commands to the game and reports its output.",
        }
    }

    pub fn system_prompt(self) -> &'static str {
        match self {
            BuiltinRole::WorldState => {
                "You maintain a map of a text adventure: rooms, exits, visible items and inventory. \
                 Update it from every report you receive and answer questions about it briefly."
            }
            BuiltinRole::Objectives => {
                "You track the player's objectives in a text adventure. \
                 Answer with a short prioritized list of goals."
            }
            BuiltinRole::Memory => {
                "You are the player's notebook. Use `remember` to store facts and `recall` to look them up. \
                 Answer with the relevant notes only."
            }
            BuiltinRole::Puzzles => {
                "You track puzzles in a text adventure: what blocks progress and what was already tried. \
                 Suggest one untried idea when asked."
            }
            BuiltinRole::GameInterface => {
                "You relay commands to the game. Call `send_command` with the requested command \
                 and answer with the game's output unchanged."
            }
        }
    }
}

/// 编排者与子 Agent 共用的设置
#[derive(Clone)]
pub struct TeamSettings {
    pub client: DynLlmClient,
    pub sink: DynEventSink,
    pub dialogue_capacity: usize,
    pub temperature: f32,
}

impl TeamSettings {
    fn agent_config(&self, name: &str, prompt: &str) -> AgentConfig {
        AgentConfig::new(name, prompt)
            .with_capacity(self.dialogue_capacity)
            .with_temperature(self.temperature)
    }
}

/// 为 `role` 构建一个子 Agent
///
/// `session` 只给游戏接口用，`store` 只给记忆角色用
pub fn child_agent(
    role: BuiltinRole,
    settings: &TeamSettings,
    session: &SessionHandle,
    store: &Arc<dyn ContextStore>,
) -> Result<ToolDispatchAgent> {
    let mut tools = ToolRegistry::new();
    match role {
        BuiltinRole::Memory => {
            tools.register(Arc::new(RememberTool::new(Arc::clone(store))))?;
            tools.register(Arc::new(RecallTool::new(Arc::clone(store))))?;
        }
        BuiltinRole::GameInterface => {
            tools.register(Arc::new(SendCommandTool::new(session.clone())))?;
        }
        _ => {}
    }
    let config = settings.agent_config(role.name(), role.system_prompt());
    Ok(ToolDispatchAgent::new(config, Arc::clone(&settings.client), tools)?
        .with_sink(Arc::clone(&settings.sink)))
}

/// 标准团队：四个顾问加一个绑定 `session` 的游戏接口
pub fn standard_orchestrator(
    name: &str,
    settings: &TeamSettings,
    session: &SessionHandle,
    store: Arc<dyn ContextStore>,
    system_prompt: Option<&str>,
) -> Result<HierarchicalOrchestrator> {
    let config = settings.agent_config(name, system_prompt.unwrap_or(ORCHESTRATOR_PROMPT));
    let mut builder = HierarchicalOrchestrator::builder(config, Arc::clone(&settings.client))
        .sink(Arc::clone(&settings.sink));
    for role in BuiltinRole::ADVISORS {
        let child: DynAgent = Arc::new(child_agent(role, settings, session, &store)?);
        builder = builder.child(role.name(), role.description(), child);
    }
    let game: DynAgent = Arc::new(child_agent(
        BuiltinRole::GameInterface,
        settings,
        session,
        &store,
    )?);
    builder.game_interface(game).build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::MemorySink;
    use crate::game::{GameSessionClient, SessionStart};
    use crate::llm::LocalEchoClient;
    use crate::state::MemoryStore;
    use async_trait::async_trait;

    struct NullGame;

    #[async_trait]
    impl GameSessionClient for NullGame {
        async fn start(&self, _game: &str) -> SessionStart {
            SessionStart::failed("offline")
        }

        async fn send_command(&self, _session_id: &str, _command: &str) -> String {
            String::new()
        }
    }

    #[test]
    fn standard_team_exposes_every_role_as_a_tool() {
        let settings = TeamSettings {
            client: Arc::new(LocalEchoClient::default()),
            sink: Arc::new(MemorySink::new()),
            dialogue_capacity: 16,
            temperature: 0.0,
        };
        let session = SessionHandle::new(Arc::new(NullGame), "s-1");
        let orchestrator =
            standard_orchestrator("team", &settings, &session, Arc::new(MemoryStore::new()), None)
                .unwrap();
        assert_eq!(
            orchestrator.root().tools().names(),
            vec!["world_state", "objectives", "memory", "puzzles", "game"]
        );
        assert_eq!(orchestrator.children().len(), 5);
    }
}
