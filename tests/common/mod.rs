#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use questflow::game::{GameSessionClient, SessionStart};
use questflow::llm::{LlmClient, LlmRequest, LlmResponse, TokenUsage};
use questflow::workflow::{DecisionStrategy, FnStrategy, StrategyFactory};
use questflow::{QuestFlowError, SessionHandle};

/// Model double that answers from a fixed script and remembers every request.
pub struct ScriptedLlm {
    model: String,
    replies: Mutex<VecDeque<String>>,
    usage: TokenUsage,
    requests: Mutex<Vec<LlmRequest>>,
}

impl ScriptedLlm {
    pub fn new<I, S>(model: &str, replies: I, usage: TokenUsage) -> Arc<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Arc::new(Self {
            model: model.to_string(),
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            usage,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: LlmRequest) -> questflow::Result<LlmResponse> {
        self.requests.lock().push(request);
        let reply = self
            .replies
            .lock()
            .pop_front()
            .ok_or_else(|| QuestFlowError::Llm("script exhausted".into()))?;
        Ok(LlmResponse::text(reply).with_usage(self.usage))
    }
}

/// Game double: answers commands from a script, then with `fallback`.
///
/// `verbose` never consumes the script. Every answer waits `delay` first.
pub struct ScriptedGame {
    session_id: String,
    intro: String,
    responses: Mutex<VecDeque<String>>,
    fallback: String,
    delay: Duration,
    commands: Mutex<Vec<String>>,
}

impl ScriptedGame {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            session_id: "session-1".into(),
            intro: "West of House\nYou are standing in an open field.".into(),
            responses: Mutex::new(responses.into_iter().map(Into::into).collect()),
            fallback: "Nothing happens.".into(),
            delay: Duration::ZERO,
            commands: Mutex::new(Vec::new()),
        }
    }

    /// A game that never ends and never reports progress.
    pub fn endless() -> Self {
        Self::new(Vec::<String>::new())
    }

    pub fn refusing_sessions() -> Self {
        Self {
            session_id: String::new(),
            intro: "could not reach game server".into(),
            ..Self::endless()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().clone()
    }
}

#[async_trait]
impl GameSessionClient for ScriptedGame {
    async fn start(&self, _game: &str) -> SessionStart {
        SessionStart {
            session_id: self.session_id.clone(),
            text: self.intro.clone(),
        }
    }

    async fn send_command(&self, _session_id: &str, command: &str) -> String {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.commands.lock().push(command.to_string());
        if command == "verbose" {
            return "Maximum verbosity.".into();
        }
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

/// Factory for a strategy that always plays `command`.
pub fn always(command: &'static str) -> StrategyFactory {
    Arc::new(move |_: &SessionHandle| -> questflow::Result<Box<dyn DecisionStrategy>> {
        Ok(Box::new(FnStrategy::scripted([command])))
    })
}

pub fn usage(prompt: u64, completion: u64) -> TokenUsage {
    TokenUsage::from_counts(prompt, completion)
}
