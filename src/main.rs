//! PoolBoard — Main Entry Point
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                   Adapters (outer ring)                   │
//! │                                                           │
//! │    SimGateway (HardwareGateway)   LogEventSink (EventSink)│
//! │                                                           │
//! │  ────────────────── Port Trait Boundary ───────────────── │
//! │                                                           │
//! │  ┌─────────────────────────────────────────────────────┐  │
//! │  │  Board: trees · routers · lifecycle · status loop   │  │
//! │  └─────────────────────────────────────────────────────┘  │
//! │                                                           │
//! │  edge-executor LocalExecutor · async-io-mini timers       │
//! └───────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use edge_executor::LocalExecutor;
use log::{error, info};
use tracing_subscriber::EnvFilter;

use poolboard::adapters::log_sink::LogEventSink;
use poolboard::adapters::sim_gateway::SimGateway;
use poolboard::board::Board;
use poolboard::config::BoardConfig;
use poolboard::tree::config::ConfigTree;

/// Virtual pool/spa control board
#[derive(Parser, Debug)]
#[command(name = "poolboard")]
#[command(about = "Virtual pool/spa control board", long_about = None)]
struct Args {
    /// Board configuration (JSON)
    #[arg(short, long, env = "POOLBOARD_CONFIG")]
    config: Option<PathBuf>,

    /// Equipment configuration snapshot to start from (JSON)
    #[arg(short, long)]
    snapshot: Option<PathBuf>,

    /// Board model, overriding the configuration file
    #[arg(short, long)]
    model: Option<String>,

    /// Simulated actuation latency (milliseconds)
    #[arg(long, default_value_t = 0)]
    latency_ms: u64,

    /// Initialise, print the state tree and exit
    #[arg(long)]
    once: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    info!("PoolBoard v{} starting", env!("CARGO_PKG_VERSION"));

    // ── Configuration ─────────────────────────────────────────
    let mut config = match &args.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            BoardConfig::from_json(&raw)?
        }
        None => BoardConfig::default(),
    };
    if let Some(model) = args.model {
        config.model = model;
    }
    config.validate()?;

    let snapshot = match &args.snapshot {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            Some(serde_json::from_str::<ConfigTree>(&raw).context("parsing equipment snapshot")?)
        }
        None => None,
    };

    // ── Board ─────────────────────────────────────────────────
    let executor = Rc::new(LocalExecutor::new());
    let model = config.model.clone();
    let gateway = SimGateway::with_latency(Duration::from_millis(args.latency_ms));
    let board = Board::new(config, gateway, Rc::clone(&executor));
    board.subscribe(LogEventSink::new());
    if let Some(tree) = snapshot {
        board.load_snapshot(tree);
    }

    let once = args.once;
    futures_lite::future::block_on(executor.run(async move {
        if let Err(e) = board.set_model(&model).await {
            error!("Board initialisation failed: {}", e);
        }
        if once {
            let state = serde_json::to_string_pretty(&board.state_snapshot())?;
            println!("{state}");
            return Ok(());
        }
        info!("Board running, state {:?}", board.board_state());
        core::future::pending::<Result<()>>().await
    }))
}
