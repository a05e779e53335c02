//! Interactive terminal chat with a memory-augmented agent.

use anyhow::Context as _;
use clap::Parser;
use log::{info, warn};
use mnema::config::{LayeredConfigOptions, MnemaConfig};
use mnema::core::{
    AgentError, CheckpointStore, Context, MemoryAgent, MemoryAgentBuilder, OpenAiChatClient,
};
use mnema::memory::{MemoryStore, Namespace};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Commands understood at the prompt besides plain chat text.
#[derive(Debug, PartialEq)]
enum ReplCommand {
    Quit,
    Memories,
    Threads,
    New,
    Chat(String),
}

impl ReplCommand {
    /// Classify one input line; blank lines yield `None`.
    fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        match line {
            "" => None,
            "exit" | "quit" | "/exit" | "/quit" => Some(Self::Quit),
            "/memories" => Some(Self::Memories),
            "/threads" => Some(Self::Threads),
            "/new" => Some(Self::New),
            text => Some(Self::Chat(text.to_string())),
        }
    }
}

/// Command-line options for the chat client.
#[derive(Parser)]
#[command(name = "mnema", version)]
struct Cli {
    /// User id that owns the long-term memories
    #[arg(long, default_value = "default-user")]
    user: String,
    /// Resume an existing thread instead of starting a new one
    #[arg(long)]
    thread: Option<String>,
    /// Extra mnema.json5 applied on top of the user and cwd layers
    #[arg(long)]
    config: Option<PathBuf>,
    /// Directory for file-backed memory and checkpoint stores
    #[arg(long)]
    data_dir: Option<PathBuf>,
    /// Override the configured model (e.g. `openai/gpt-4o`)
    #[arg(long)]
    model: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    mnema::init_logging();
    let cli = Cli::parse();

    let cwd = std::env::current_dir().context("resolve current directory")?;
    let mut options = LayeredConfigOptions::new(&cwd);
    if let Some(path) = &cli.config {
        options = options.with_runtime_path(path);
    }
    let layered = MnemaConfig::load_layered_with_options(options).context("load config")?;
    let config = layered.config;
    info!("config loaded (layers={})", layered.layers.len());

    let data_dir = cli.data_dir.clone().unwrap_or_else(mnema::default_data_dir);
    let model = OpenAiChatClient::from_config(&config.model)?;
    let agent = MemoryAgentBuilder::from_config(Arc::new(model), &config, &data_dir)?.build()?;

    let mut ctx = Context::from_config(cli.user.clone(), &config.agent);
    if let Some(model) = &cli.model {
        ctx = ctx.with_model(model.clone());
    }
    if let Some(thread_id) = &cli.thread {
        ctx = ctx.with_thread_id(thread_id.clone());
    }
    println!(
        "mnema ready (user={}, thread={}, data_dir={})",
        ctx.user_id,
        ctx.thread_id,
        data_dir.display()
    );
    println!("type /memories, /threads, /new, or exit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let Some(command) = ReplCommand::parse(&line) else {
            continue;
        };
        match command {
            ReplCommand::Quit => break,
            ReplCommand::Memories => print_memories(&agent, &ctx).await?,
            ReplCommand::Threads => print_threads(&agent)?,
            ReplCommand::New => {
                ctx = Context::from_config(ctx.user_id.clone(), &config.agent)
                    .with_model(ctx.model.clone());
                println!("started thread {}", ctx.thread_id);
            }
            ReplCommand::Chat(text) => chat(&agent, &ctx, &text).await?,
        }
    }
    Ok(())
}

async fn chat(agent: &MemoryAgent, ctx: &Context, text: &str) -> anyhow::Result<()> {
    match agent.chat(text, ctx).await {
        Ok(state) => {
            let reply = state
                .last_model_reply()
                .map(|message| message.content.as_str())
                .unwrap_or_default();
            println!("{reply}");
        }
        Err(err @ AgentError::LoopLimitExceeded { .. }) => {
            // Keep the partial exchange so the thread can be inspected later.
            if let Some(state) = err.partial_state() {
                if state.unanswered_tool_calls().is_empty() {
                    agent.checkpoint_store().save(state)?;
                }
            }
            eprintln!("error: {err}");
        }
        Err(err) => {
            warn!("turn failed (kind={}, err={})", err.kind().as_str(), err);
            eprintln!("error: {err}");
        }
    }
    Ok(())
}

async fn print_memories(agent: &MemoryAgent, ctx: &Context) -> anyhow::Result<()> {
    let records = agent
        .memory_store()
        .list(&Namespace::memories(ctx.user_id.clone()))
        .await?;
    if records.is_empty() {
        println!("no memories for {}", ctx.user_id);
    }
    for record in records {
        println!("[{}]: {}", record.key, record.value);
    }
    Ok(())
}

fn print_threads(agent: &MemoryAgent) -> anyhow::Result<()> {
    for summary in agent.checkpoint_store().list_threads()? {
        println!(
            "{} ({} messages, updated {})",
            summary.thread_id,
            summary.message_count,
            summary.updated_at.to_rfc3339()
        );
    }
    Ok(())
}
