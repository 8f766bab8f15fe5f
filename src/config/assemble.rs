use std::sync::Arc;

use tracing::info;

use crate::agent::{standard_orchestrator, AgentConfig, TeamSettings, ToolDispatchAgent};
use crate::error::Result;
use crate::events::DynEventSink;
use crate::game::{DynGameClient, SessionHandle};
use crate::llm::{default_prices, DynLlmClient, LocalEchoClient, PriceTable};
use crate::state::{ContextStore, MemoryStore};
use crate::tools::{RecallTool, RememberTool, ToolRegistry};
use crate::workflow::{
    AgentStrategy, DecisionStrategy, DirectStrategy, StrategyFactory, TurnWorkflow, WorkflowConfig,
};

use super::env::EnvConfig;
use super::run::{RunConfig, StrategyKind, WorkflowDefinition};

const DEFAULT_API_KEY_VAR: &str = "OPENAI_API_KEY";

const DIRECT_PROMPT: &str = "You are playing a text adventure. The user messages are the game's output \
and your previous messages are the commands you typed. Reply with the next command only.";

const AGENT_PROMPT: &str = "You are playing a text adventure. Each message is the game's latest output. \
Keep notes with `remember`/`recall` when useful, then respond with the next command only.";

/// 为单个工作流构建模型客户端
///
/// 未配置 endpoint 时使用离线 echo 客户端，沿用工作流的模型名
pub fn llm_client(definition: &WorkflowDefinition) -> Result<DynLlmClient> {
    let Some(endpoint) = &definition.endpoint else {
        return Ok(Arc::new(LocalEchoClient::named(definition.model.as_str())));
    };
    http_client(definition, endpoint)
}

#[cfg(feature = "openai-client")]
fn http_client(definition: &WorkflowDefinition, endpoint: &str) -> Result<DynLlmClient> {
    use crate::llm::{GenericHttpClient, RetryingClient};

    let api_key = EnvConfig::get_api_key(definition.api_key.as_deref(), DEFAULT_API_KEY_VAR)?;
    let client = GenericHttpClient::new(endpoint, api_key, definition.model.as_str())?;
    Ok(RetryingClient::wrap(Arc::new(client)))
}

#[cfg(not(feature = "openai-client"))]
fn http_client(definition: &WorkflowDefinition, _endpoint: &str) -> Result<DynLlmClient> {
    // 无论是否启用 HTTP 客户端都解析 key，缺失时报错一致
    EnvConfig::get_api_key(definition.api_key.as_deref(), DEFAULT_API_KEY_VAR)?;
    Err(crate::error::QuestFlowError::Config(format!(
        "workflow `{}` sets an endpoint but questflow was built without the `openai-client` feature",
        definition.name
    )))
}

/// 按会话为单个定义构建策略
pub fn strategy_factory(
    definition: &WorkflowDefinition,
    client: DynLlmClient,
    dialogue_capacity: usize,
    sink: DynEventSink,
) -> StrategyFactory {
    let definition = definition.clone();
    Arc::new(move |session: &SessionHandle| -> Result<Box<dyn DecisionStrategy>> {
        let prompt = definition.system_prompt.as_deref();
        match definition.strategy {
            StrategyKind::Direct => Ok(Box::new(
                DirectStrategy::new(Arc::clone(&client), prompt.unwrap_or(DIRECT_PROMPT))
                    .with_temperature(definition.temperature),
            )),
            StrategyKind::Agent => {
                let store: Arc<dyn ContextStore> = Arc::new(MemoryStore::new());
                let tools = ToolRegistry::new()
                    .with_tool(Arc::new(RememberTool::new(Arc::clone(&store))))?
                    .with_tool(Arc::new(RecallTool::new(store)))?;
                let config =
                    AgentConfig::new(definition.name.as_str(), prompt.unwrap_or(AGENT_PROMPT))
                        .with_capacity(dialogue_capacity)
                        .with_temperature(definition.temperature);
                let agent = ToolDispatchAgent::new(config, Arc::clone(&client), tools)?
                    .with_sink(Arc::clone(&sink));
                Ok(Box::new(AgentStrategy::new(Arc::new(agent))))
            }
            StrategyKind::Hierarchical => {
                let settings = TeamSettings {
                    client: Arc::clone(&client),
                    sink: Arc::clone(&sink),
                    dialogue_capacity,
                    temperature: definition.temperature,
                };
                let team = standard_orchestrator(
                    &definition.name,
                    &settings,
                    session,
                    Arc::new(MemoryStore::new()),
                    prompt,
                )?;
                Ok(Box::new(AgentStrategy::new(Arc::new(team))))
            }
        }
    })
}

/// 内置价格表叠加配置中的价格
pub fn price_table(config: &RunConfig) -> PriceTable {
    let mut prices = default_prices();
    prices.extend(config.prices.clone());
    prices
}

/// 把选中的定义组装成可运行的工作流
pub fn build_workflows(
    config: &RunConfig,
    selected: &[&WorkflowDefinition],
    game: DynGameClient,
    sink: DynEventSink,
) -> Result<Vec<TurnWorkflow>> {
    let prices = Arc::new(price_table(config));
    selected
        .iter()
        .map(|definition| {
            let capacity = definition.dialogue_capacity.unwrap_or(config.dialogue_capacity);
            let client = llm_client(definition)?;
            info!(workflow = %definition.name, model = %client.model(), "workflow configured");
            let mut workflow_config =
                WorkflowConfig::new(definition.name.as_str(), config.game.as_str())
                    .display(definition.display())
                    .max_iterations(definition.max_iterations.unwrap_or(config.max_iterations))
                    .dialogue_capacity(capacity);
            if let Some(prompt) = &definition.system_prompt {
                workflow_config = workflow_config.system_prompt(prompt.as_str());
            }
            let factory = strategy_factory(definition, client, capacity, Arc::clone(&sink));
            Ok(TurnWorkflow::new(workflow_config, Arc::clone(&game), factory)
                .with_prices(Arc::clone(&prices))
                .with_sink(Arc::clone(&sink)))
        })
        .collect()
}
