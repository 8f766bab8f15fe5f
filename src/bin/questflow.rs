use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use questflow::config::{build_workflows, RunConfig, RunMode};
use questflow::events::tracing_sink;
use questflow::game::HttpGameClient;
use questflow::utils::LoggingConfig;
use questflow::workflow::{summary_table, ComparisonReport, WorkflowRunner};

#[derive(Parser)]
#[command(name = "questflow", version, about = "Run and compare text-adventure workflows", author)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Play every selected workflow once and print the comparison.
    Run {
        #[arg(long)]
        config: PathBuf,
        /// Comma-separated workflow names.
        #[arg(long, value_delimiter = ',')]
        only: Vec<String>,
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,
        #[arg(long)]
        concurrency: Option<usize>,
        #[arg(long)]
        max_iterations: Option<u32>,
        /// Also print the results as JSON.
        #[arg(long)]
        json: bool,
    },
    /// List the workflows defined in a config file.
    List {
        #[arg(long)]
        config: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Sequential,
    Parallel,
}

impl From<ModeArg> for RunMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Sequential => RunMode::Sequential,
            ModeArg::Parallel => RunMode::Parallel,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    LoggingConfig::init();

    let cli = Cli::parse();
    match cli.command {
        Command::Run {
            config,
            only,
            mode,
            concurrency,
            max_iterations,
            json,
        } => {
            let mut run_config = load(&config)?;
            if let Some(mode) = mode {
                run_config.mode = mode.into();
            }
            if let Some(concurrency) = concurrency {
                run_config.concurrency = concurrency;
            }
            if let Some(max_iterations) = max_iterations {
                run_config.max_iterations = max_iterations;
            }
            handle_run(run_config, &only, json).await?
        }
        Command::List { config } => handle_list(&load(&config)?),
    }
    Ok(())
}

fn load(path: &Path) -> anyhow::Result<RunConfig> {
    RunConfig::from_path(path).with_context(|| format!("loading {}", path.display()))
}

async fn handle_run(config: RunConfig, only: &[String], json: bool) -> anyhow::Result<()> {
    let selected = config.select(only)?;
    let sink = tracing_sink();
    let game = Arc::new(HttpGameClient::new(config.game_url.as_str())?);
    let workflows = build_workflows(&config, &selected, game, Arc::clone(&sink))?;
    let mut runner = WorkflowRunner::new(config.execution_mode(), workflows)?.with_sink(sink);

    let results = runner.run().await;

    println!("{}", summary_table(&results));
    println!("{}", ComparisonReport::from_results(&results).render());
    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    }
    Ok(())
}

fn handle_list(config: &RunConfig) {
    println!("{:<24} {:<14} {:<24} {}", "Name", "Strategy", "Model", "Endpoint");
    for workflow in &config.workflows {
        println!(
            "{:<24} {:<14} {:<24} {}",
            workflow.name,
            workflow.strategy,
            workflow.model,
            workflow.endpoint.as_deref().unwrap_or("(offline echo)")
        );
    }
}
