//! Brainstorm REST Server
//!
//! Serves the callable endpoints and, unless disabled, runs the daily
//! brainstorm batch in the same process.

use anyhow::Result;
use axum::http::HeaderName;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use brainstorm::clock::{Clock, SystemClock};
use brainstorm::config::Config;
use brainstorm::scheduler::{BatchScheduler, DailySchedule};
use brainstorm::server::{startup::start_server, AppState};

#[derive(Parser)]
#[command(name = "brainstorm_server")]
#[command(about = "Brainstorm REST API Server")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Args {
  /// Server bind address; defaults to the configured value
  #[arg(long)]
  bind: Option<SocketAddr>,

  /// Config file (defaults to ~/.brainstorm/config.yaml)
  #[arg(long)]
  config: Option<PathBuf>,

  /// Serve requests without running the daily batch
  #[arg(long)]
  no_scheduler: bool,

  /// Enable verbose logging
  #[arg(short, long)]
  verbose: bool,
}

async fn wait_for(mut rx: watch::Receiver<bool>) {
  while !*rx.borrow() {
    if rx.changed().await.is_err() {
      return;
    }
  }
}

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();

  let filter = if args.verbose {
    EnvFilter::new("brainstorm=debug,tower_http=debug,info")
  } else {
    EnvFilter::new("brainstorm=info,warn")
  };
  tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

  let config = Config::load(args.config.as_deref())?;
  let bind: SocketAddr = match args.bind {
    Some(bind) => bind,
    None => config.server.bind.parse()?,
  };

  tracing::info!(version = env!("CARGO_PKG_VERSION"), %bind, store = ?config.store.backend, "starting brainstorm server");

  let clock: Arc<dyn Clock> = Arc::new(SystemClock);
  let repository = Arc::new(config.build_repository(clock.clone())?);
  let caller_header = HeaderName::from_bytes(config.server.caller_header.as_bytes())?;

  let (shutdown_tx, shutdown_rx) = watch::channel(false);

  let scheduler_task = if args.no_scheduler {
    None
  } else {
    let schedule = DailySchedule::new(config.schedule_time()?, config.timezone()?);
    let scheduler = BatchScheduler::new(repository.clone(), schedule, clock, config.schedule.retention_days);
    let rx = shutdown_rx.clone();
    Some(tokio::spawn(async move { scheduler.run_until(wait_for(rx)).await }))
  };

  let state = AppState::new(repository, caller_header).with_scheduler(scheduler_task.is_some());

  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      tracing::info!("shutdown signal received");
    }
    let _ = shutdown_tx.send(true);
  });

  start_server(bind, state, wait_for(shutdown_rx)).await?;

  if let Some(task) = scheduler_task {
    task.await?;
  }
  Ok(())
}
