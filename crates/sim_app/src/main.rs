//! # sim_app
//!
//! Runs one simulation.
//!
//! ## Startup Sequence
//!
//! 1. Seed the world and seal the phase pipeline.
//! 2. With `--advance`, run one advance locally and exit.
//! 3. Otherwise connect to NATS, bridge `sim.faction.<id>.in/out` onto the
//!    faction queues, and run the dispatch loop until a faction sends `quit`
//!    or a bridge task fails.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use sim_app::cli::{Args, DEFAULT_LOG_FILTER};
use sim_app::{DispatchLoop, build_kernel, supervise};
use sim_net::{CommandQueues, NatsBridge, NatsConnection};
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

const OUTBOUND_FLUSH_INTERVAL: Duration = Duration::from_millis(20);

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let args = Args::parse();
    let (mut kernel, factions) =
        build_kernel(args.kernel_config(), args.factions, args.contact_range)?;

    if let Some(seconds) = args.advance {
        let report = kernel.advance(seconds)?;
        info!(
            advanced_secs = report.advanced_secs,
            subpulses = report.subpulses,
            interrupted = report.interrupted,
            now = report.now,
            "local advance complete"
        );
        return Ok(());
    }

    let queues = Arc::new(CommandQueues::new());
    for &faction in &factions {
        queues.register_faction(faction);
        info!(%faction, subject = %sim_net::subjects::faction_inbound(faction), "faction ready");
    }

    let conn = NatsConnection::connect_to(&args.nats_url).await?;
    let bridge = NatsBridge::new(conn, Arc::clone(&queues));

    let inbound = {
        let bridge = bridge.clone();
        tokio::spawn(async move { bridge.forward_inbound().await })
    };
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let outbound = {
        let bridge = bridge.clone();
        tokio::spawn(async move { bridge.run_outbound(OUTBOUND_FLUSH_INTERVAL, shutdown_rx).await })
    };

    let dispatch = DispatchLoop::new(kernel, queues, args.dispatch_config());
    let summary = supervise(dispatch, inbound, outbound, shutdown_tx).await?;
    info!(processed = summary.processed, "simulation shut down");
    Ok(())
}
