use std::sync::Arc;

use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::agent::{BoundedDialogue, MessageRole};
use crate::error::{QuestFlowError, Result};
use crate::events::{tracing_sink, DynEventSink, FlowEvent};
use crate::game::{self, DynGameClient, Exchange, Progress, SessionHandle};
use crate::llm::{PriceTable, UsageLedger};

use super::result::{TurnRecord, WorkflowResult, WorkflowState};
use super::strategy::{DecisionStrategy, StrategyFactory};

pub const DEFAULT_MAX_ITERATIONS: u32 = 100;
pub const DEFAULT_SETUP_COMMAND: &str = "verbose";

/// 单个工作流配置
#[derive(Clone, Debug)]
pub struct WorkflowConfig {
    pub name: String,
    /// 策略与模型的可读描述
    pub display: String,
    pub game: String,
    pub max_iterations: u32,
    pub dialogue_capacity: usize,
    pub system_prompt: String,
    /// 第一回合前发送一次，回应丢弃
    pub setup_command: Option<String>,
}

impl WorkflowConfig {
    pub fn new(name: impl Into<String>, game: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            display: name.clone(),
            name,
            game: game.into(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            dialogue_capacity: 40,
            system_prompt: "You are playing a text adventure. Reply with the next command only."
                .to_string(),
            setup_command: Some(DEFAULT_SETUP_COMMAND.to_string()),
        }
    }

    pub fn display(mut self, display: impl Into<String>) -> Self {
        self.display = display.into();
        self
    }

    pub fn max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn dialogue_capacity(mut self, capacity: usize) -> Self {
        self.dialogue_capacity = capacity;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn setup_command(mut self, command: Option<String>) -> Self {
        self.setup_command = command;
        self
    }
}

/// 玩一局游戏直到完成、超时或失败
///
/// 错误不会逃出 `run`：状态变为 [`WorkflowState::Failed`]，
/// 并返回降级的 [`WorkflowResult`]
pub struct TurnWorkflow {
    config: WorkflowConfig,
    client: DynGameClient,
    factory: StrategyFactory,
    prices: Arc<PriceTable>,
    sink: DynEventSink,
    state: WorkflowState,
    dialogue: BoundedDialogue,
    records: Vec<TurnRecord>,
    progress: Progress,
    strategy: Option<Box<dyn DecisionStrategy>>,
}

impl TurnWorkflow {
    pub fn new(config: WorkflowConfig, client: DynGameClient, factory: StrategyFactory) -> Self {
        let dialogue = BoundedDialogue::new(config.dialogue_capacity, config.system_prompt.as_str());
        Self {
            config,
            client,
            factory,
            prices: Arc::new(PriceTable::new()),
            sink: tracing_sink(),
            state: WorkflowState::NotStarted,
            dialogue,
            records: Vec::new(),
            progress: Progress::default(),
            strategy: None,
        }
    }

    pub fn with_prices(mut self, prices: Arc<PriceTable>) -> Self {
        self.prices = prices;
        self
    }

    pub fn with_sink(mut self, sink: DynEventSink) -> Self {
        self.sink = sink;
        self
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    pub fn dialogue(&self) -> &BoundedDialogue {
        &self.dialogue
    }

    pub fn records(&self) -> &[TurnRecord] {
        &self.records
    }

    pub fn progress(&self) -> Progress {
        self.progress
    }

    pub fn usage(&self) -> UsageLedger {
        self.strategy
            .as_ref()
            .map(|strategy| strategy.usage())
            .unwrap_or_default()
    }

    /// 外部中断（如 panic）后把状态收敛到 `Failed`
    pub fn mark_failed(&mut self) {
        self.state = WorkflowState::Failed;
    }

    fn reset(&mut self) {
        self.dialogue =
            BoundedDialogue::new(self.config.dialogue_capacity, self.config.system_prompt.as_str());
        self.records.clear();
        self.progress = Progress::default();
        self.strategy = None;
    }

    #[instrument(skip(self), fields(workflow = %self.config.name))]
    pub async fn run(&mut self) -> WorkflowResult {
        let started = Instant::now();
        self.reset();
        self.state = WorkflowState::Running;
        self.sink.emit(FlowEvent::WorkflowStarted {
            workflow: self.config.name.clone(),
            game: self.config.game.clone(),
        });

        let error = match self.play().await {
            Ok(state) => {
                self.state = state;
                None
            }
            Err(error) => {
                warn!(error = %error, "workflow failed");
                self.state = WorkflowState::Failed;
                self.sink.emit(FlowEvent::WorkflowFailed {
                    workflow: self.config.name.clone(),
                    error: error.to_string(),
                });
                Some(error.to_string())
            }
        };

        let usage = self.usage();
        let failed = self.state == WorkflowState::Failed;
        let (score, moves) = if failed {
            (0, 0)
        } else {
            (self.progress.score_or_zero(), self.progress.moves_or_zero())
        };
        let turns = self.records.len() as u32;
        self.sink.emit(FlowEvent::WorkflowFinished {
            workflow: self.config.name.clone(),
            state: self.state.to_string(),
            score,
            moves,
            turns,
        });

        WorkflowResult {
            name: self.config.name.clone(),
            display: self.config.display.clone(),
            state: self.state,
            score,
            moves,
            completed: self.state == WorkflowState::Completed,
            turns,
            elapsed: started.elapsed(),
            estimated_cost: usage.cost(&self.prices),
            usage,
            error,
        }
    }

    async fn play(&mut self) -> Result<WorkflowState> {
        let start = self.client.start(&self.config.game).await;
        if !start.is_started() {
            return Err(QuestFlowError::SessionStart(start.text));
        }
        info!(session = %start.session_id, "session started");
        let session = SessionHandle::new(Arc::clone(&self.client), start.session_id.as_str());
        self.dialogue.append(MessageRole::User, start.text.as_str());
        let mut last_text = start.text;

        let mut strategy = (self.factory)(&session)?;

        if let Some(setup) = &self.config.setup_command {
            let discarded = session.send(setup).await;
            debug!(command = %setup, chars = discarded.len(), "setup command sent");
        }
        session.take_exchanges();

        let mut outcome = WorkflowState::TimedOut;
        for turn in 1..=self.config.max_iterations {
            self.progress.observe(&last_text);

            let decided = strategy.next_command(&self.dialogue).await;
            let command = match decided {
                Ok(command) => command,
                Err(error) => {
                    self.strategy = Some(strategy);
                    return Err(error);
                }
            };

            // 策略的工具已经发出的命令算作本回合
            let mut exchanges = session.take_exchanges();
            if exchanges.is_empty() {
                session.send(&command).await;
                exchanges = session.take_exchanges();
            } else {
                debug!(played = exchanges.len(), decided = %command, "strategy played through the session");
            }

            let mut terminated = false;
            for exchange in &exchanges {
                self.dialogue
                    .append(MessageRole::Assistant, exchange.command.as_str())
                    .append(MessageRole::User, exchange.response.as_str());
                terminated |= game::is_game_over(&exchange.response);
            }
            let Some(Exchange { command, response }) = exchanges.pop() else {
                continue;
            };

            let mut seen = self.progress;
            seen.observe(&response);
            self.sink.emit(FlowEvent::TurnCompleted {
                workflow: self.config.name.clone(),
                turn,
                command: command.clone(),
                score: seen.score,
                moves: seen.moves,
                terminated,
            });
            self.records.push(TurnRecord {
                turn,
                command,
                score: game::extract_score(&response),
                moves: game::extract_moves(&response),
                response: response.clone(),
                terminated,
            });
            last_text = response;

            if terminated {
                debug!(turn, reason = ?game::termination_reason(&last_text), "game ended");
                outcome = WorkflowState::Completed;
                break;
            }
        }

        self.progress.observe(&last_text);
        self.strategy = Some(strategy);
        Ok(outcome)
    }
}

impl std::fmt::Debug for TurnWorkflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnWorkflow")
            .field("name", &self.config.name)
            .field("state", &self.state)
            .field("turns", &self.records.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{GameSessionClient, SessionStart};
    use crate::workflow::FnStrategy;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct EchoGame {
        commands: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl GameSessionClient for EchoGame {
        async fn start(&self, _game: &str) -> SessionStart {
            SessionStart {
                session_id: "s-1".into(),
                text: "West of House".into(),
            }
        }

        async fn send_command(&self, _session_id: &str, command: &str) -> String {
            let mut commands = self.commands.lock();
            commands.push(command.to_string());
            format!("You typed {command}. Score: 0 Moves: {}", commands.len())
        }
    }

    fn scripted() -> StrategyFactory {
        Arc::new(|_: &SessionHandle| -> Result<Box<dyn DecisionStrategy>> {
            Ok(Box::new(FnStrategy::scripted(["look"])))
        })
    }

    #[tokio::test]
    async fn setup_command_precedes_turns_and_is_not_recorded() {
        let game = Arc::new(EchoGame::default());
        let mut workflow = TurnWorkflow::new(
            WorkflowConfig::new("w", "zork1").max_iterations(2),
            game.clone(),
            scripted(),
        );
        let result = workflow.run().await;
        assert_eq!(*game.commands.lock(), vec!["verbose", "look", "look"]);
        assert_eq!(workflow.records().len(), 2);
        assert_eq!(result.state, WorkflowState::TimedOut);
        assert_eq!(result.moves, 3);
    }

    #[tokio::test]
    async fn dialogue_alternates_commands_and_responses() {
        let mut workflow = TurnWorkflow::new(
            WorkflowConfig::new("w", "zork1")
                .max_iterations(1)
                .setup_command(None),
            Arc::new(EchoGame::default()),
            scripted(),
        );
        workflow.run().await;
        let roles: Vec<MessageRole> = workflow.dialogue().messages().iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![
                MessageRole::System,
                MessageRole::User,
                MessageRole::Assistant,
                MessageRole::User
            ]
        );
    }

    #[tokio::test]
    async fn factory_error_fails_the_run() {
        let factory: StrategyFactory = Arc::new(
            |_: &SessionHandle| -> Result<Box<dyn DecisionStrategy>> {
                Err(QuestFlowError::Config("no model".into()))
            },
        );
        let mut workflow = TurnWorkflow::new(
            WorkflowConfig::new("w", "zork1"),
            Arc::new(EchoGame::default()),
            factory,
        );
        let result = workflow.run().await;
        assert_eq!(workflow.state(), WorkflowState::Failed);
        assert!(!result.completed);
        assert_eq!(result.error.as_deref(), Some("configuration error: no model"));
    }
}
