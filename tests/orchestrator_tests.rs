mod common;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use common::{usage, ScriptedGame, ScriptedLlm};
use parking_lot::Mutex;
use questflow::agent::{
    standard_orchestrator, Agent, AgentConfig, ChildAgentTool, HierarchicalOrchestrator,
    TeamSettings,
};
use questflow::events::MemorySink;
use questflow::llm::{LocalEchoClient, TokenUsage, UsageLedger};
use questflow::{Message, MemoryStore, SessionHandle};

/// Child double with a settable ledger that remembers what it was asked.
struct FixedChild {
    name: String,
    model: String,
    usage: Mutex<TokenUsage>,
    inbox: Mutex<Vec<String>>,
    reply: String,
}

impl FixedChild {
    fn new(name: &str, model: &str, usage: TokenUsage, reply: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            model: model.to_string(),
            usage: Mutex::new(usage),
            inbox: Mutex::new(Vec::new()),
            reply: reply.to_string(),
        })
    }

    fn set_usage(&self, usage: TokenUsage) {
        *self.usage.lock() = usage;
    }

    fn inbox(&self) -> Vec<String> {
        self.inbox.lock().clone()
    }
}

#[async_trait]
impl Agent for FixedChild {
    fn name(&self) -> &str {
        &self.name
    }

    async fn process_message(&self, message: &str) -> String {
        self.inbox.lock().push(message.to_string());
        self.reply.clone()
    }

    fn usage(&self) -> UsageLedger {
        let mut ledger = UsageLedger::new();
        ledger.record(&self.model, *self.usage.lock());
        ledger
    }

    fn history(&self) -> Vec<Message> {
        Vec::new()
    }
}

#[tokio::test]
async fn usage_sums_children_per_model_and_keeps_root_separate() -> Result<()> {
    let world = FixedChild::new("world", "gpt-4o-mini", TokenUsage::new(10, 20, 30), "dark");
    let puzzles = FixedChild::new("puzzles", "gpt-4o-mini", TokenUsage::new(5, 5, 10), "grue");
    let llm = ScriptedLlm::new(
        "gpt-4o",
        [r#"{"action":"respond","reply":"look"}"#],
        usage(100, 1),
    );
    let orchestrator = HierarchicalOrchestrator::builder(AgentConfig::new("root", "lead"), llm)
        .child("world_state", "tracks the world", world)
        .child("puzzles", "thinks about puzzles", puzzles)
        .build()?;

    orchestrator.process_message("You are in a forest.").await;

    let total = orchestrator.usage();
    assert_eq!(total.get("gpt-4o-mini"), Some(TokenUsage::new(15, 25, 40)));
    assert_eq!(total.get("gpt-4o"), Some(TokenUsage::new(100, 1, 101)));
    assert_eq!(orchestrator.own_usage().get("gpt-4o-mini"), None);
    assert_eq!(orchestrator.children().len(), 2);
    Ok(())
}

#[tokio::test]
async fn usage_is_recomputed_from_the_children_each_time() -> Result<()> {
    let child = FixedChild::new("memory", "gpt-4o-mini", TokenUsage::new(1, 1, 2), "noted");
    let orchestrator = HierarchicalOrchestrator::builder(
        AgentConfig::new("root", "lead"),
        ScriptedLlm::new("gpt-4o", Vec::<String>::new(), usage(0, 0)),
    )
    .child("memory", "keeps notes", child.clone())
    .build()?;

    assert_eq!(orchestrator.usage().total().total_tokens, 2);
    child.set_usage(TokenUsage::new(4, 4, 8));
    assert_eq!(orchestrator.usage().total().total_tokens, 8);
    Ok(())
}

#[tokio::test]
async fn delegation_forwards_the_request_and_returns_the_child_reply() -> Result<()> {
    let puzzles = FixedChild::new(
        "puzzles",
        "gpt-4o-mini",
        TokenUsage::default(),
        "Wave the sceptre at the rainbow.",
    );
    let llm = ScriptedLlm::new(
        "gpt-4o",
        [
            r#"{"action":"puzzles","params":{"request":"how do I cross the river?"}}"#,
            "wave sceptre",
        ],
        usage(3, 3),
    );
    let orchestrator =
        HierarchicalOrchestrator::builder(AgentConfig::new("root", "lead"), llm.clone())
            .child("puzzles", "solves puzzles", puzzles.clone())
            .build()?;

    let reply = orchestrator.process_message("A rainbow spans the falls.").await;

    assert_eq!(reply, "wave sceptre");
    let inbox = puzzles.inbox();
    assert_eq!(inbox.len(), 1);
    assert!(inbox[0].contains("request: how do I cross the river?"), "{}", inbox[0]);
    let final_request = &llm.requests()[1];
    assert!(final_request
        .messages
        .iter()
        .any(|m| m.content == "Wave the sceptre at the rainbow."));
    Ok(())
}

#[tokio::test]
async fn custom_parameter_names_are_honoured() -> Result<()> {
    let game = FixedChild::new("game", "gpt-4o-mini", TokenUsage::default(), "Taken.");
    let llm = ScriptedLlm::new(
        "gpt-4o",
        [r#"{"action":"game","params":{"command":"take lamp"}}"#, "take lamp"],
        usage(1, 1),
    );
    let tool =
        ChildAgentTool::with_parameter("game", "plays commands", "command", "command", game.clone())
            .instruction("Play this:");
    let orchestrator = HierarchicalOrchestrator::builder(AgentConfig::new("root", "lead"), llm)
        .delegate(tool)
        .build()?;

    orchestrator.process_message("A lamp is here.").await;

    assert_eq!(game.inbox(), vec!["Play this:\ncommand: take lamp".to_string()]);
    Ok(())
}

#[test]
fn duplicate_child_names_are_rejected() {
    let a = FixedChild::new("a", "m", TokenUsage::default(), "");
    let b = FixedChild::new("b", "m", TokenUsage::default(), "");
    let outcome = HierarchicalOrchestrator::builder(
        AgentConfig::new("root", "lead"),
        Arc::new(LocalEchoClient::default()),
    )
    .child("same", "first", a)
    .child("same", "second", b)
    .build();

    assert!(outcome.is_err());
}

#[tokio::test]
async fn standard_team_plays_through_its_game_interface() -> Result<()> {
    let game = Arc::new(ScriptedGame::new(["You see a small mailbox."]));
    let session = SessionHandle::new(game.clone(), "session-1");
    let llm = ScriptedLlm::new(
        "gpt-4o",
        [
            // orchestrator picks the game tool
            r#"{"action":"game","params":{"command":"open mailbox"}}"#,
            // game interface child calls send_command
            r#"{"action":"send_command","params":{"command":"open mailbox"}}"#,
            // child's reply after the tool result
            "You see a small mailbox.",
            // orchestrator's final answer
            "open mailbox",
        ],
        usage(2, 1),
    );
    let settings = TeamSettings {
        client: llm.clone(),
        sink: Arc::new(MemorySink::new()),
        dialogue_capacity: 16,
        temperature: 0.0,
    };
    let orchestrator = standard_orchestrator(
        "zork-team",
        &settings,
        &session,
        Arc::new(MemoryStore::new()),
        None,
    )?;

    let reply = orchestrator.process_message("West of House").await;

    assert_eq!(reply, "open mailbox");
    assert_eq!(game.commands(), vec!["open mailbox"]);
    assert_eq!(session.take_exchanges().len(), 1);
    assert_eq!(orchestrator.usage().get("gpt-4o").map(|u| u.total_tokens), Some(12));
    assert_eq!(orchestrator.own_usage().get("gpt-4o").map(|u| u.total_tokens), Some(6));
    Ok(())
}
