use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use brainstorm::cli::cache::IdeaCache;
use brainstorm::cli::client::{BrainstormClient, ClientConfig};
use brainstorm::cli::commands;

#[derive(Parser)]
#[command(name = "brainstorm")]
#[command(about = "Brainstorm - Scheduled and On-Demand Idea Generation")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
  /// Base URL of the brainstorm server
  #[arg(long, global = true, env = "BRAINSTORM_SERVER", default_value = "http://localhost:3000")]
  server: String,

  /// Caller id passed to the server as the authenticated user
  #[arg(long, global = true, env = "BRAINSTORM_CALLER_ID")]
  caller: Option<String>,

  /// Header used to pass the caller id
  #[arg(long, global = true, env = "BRAINSTORM_CALLER_HEADER", default_value = "x-caller-id")]
  caller_header: String,

  /// Config file for batch and cleanup runs
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  /// Where `list` keeps its offline copy; defaults to ~/.brainstorm/ideas_cache.json
  #[arg(long, global = true, env = "BRAINSTORM_CACHE")]
  cache: Option<PathBuf>,

  /// Enable verbose logging
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Generate ideas for a category
  Request {
    /// features, ui, optimization, integration or custom
    category: String,
    /// Prompt for the custom category
    #[arg(short, long)]
    prompt: Option<String>,
  },
  /// Star an idea so it is kept
  Star {
    /// Idea id
    id: String,
  },
  /// Remove the star from an idea
  Unstar {
    /// Idea id
    id: String,
  },
  /// List stored ideas, newest first
  List {
    /// Only ideas in this category
    #[arg(short, long)]
    category: Option<String>,
    /// Only starred ideas
    #[arg(short, long)]
    starred: bool,
  },
  /// Run the scheduled batch once
  Batch,
  /// Delete unstarred ideas older than the retention window
  Cleanup {
    /// Retention window in days; defaults to the configured value
    #[arg(long)]
    days: Option<u32>,
  },
}

async fn handle(cli: Cli) -> Result<()> {
  let client = || {
    BrainstormClient::with_config(ClientConfig {
      base_url: cli.server.clone(),
      caller_id: cli.caller.clone(),
      caller_header: cli.caller_header.clone(),
      ..ClientConfig::default()
    })
  };

  match &cli.command {
    Command::Request { category, prompt } => {
      commands::request_ideas(&client()?, category, prompt.as_deref()).await
    }
    Command::Star { id } => commands::set_starred(&client()?, id, true).await,
    Command::Unstar { id } => commands::set_starred(&client()?, id, false).await,
    Command::List { category, starred } => {
      let cache = cli.cache.clone().or_else(IdeaCache::default_path).map(IdeaCache::new);
      commands::list_ideas(&client()?, cache.as_ref(), category.as_deref(), *starred).await
    }
    Command::Batch => commands::run_batch(cli.config.as_deref()).await,
    Command::Cleanup { days } => commands::run_cleanup(cli.config.as_deref(), *days).await,
  }
}

#[tokio::main]
async fn main() -> Result<()> {
  let cli = Cli::parse();

  let filter = if cli.verbose { EnvFilter::new("brainstorm=debug,warn") } else { EnvFilter::new("warn") };
  tracing_subscriber::registry().with(fmt::layer().with_writer(std::io::stderr)).with(filter).init();

  handle(cli).await
}
