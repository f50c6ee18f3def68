//! Sonar broadcaster runner
//!
//! Drives the broadcaster with a simulated peripheral: powers it on, rotates
//! the identity periodically and reports health, until interrupted.

mod cli;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::sync::watch;
use tracing::{info, warn};
use uuid::Uuid;

use sonar_ble::{
    event_channel, BroadcastControl, BroadcastTask, BroadcasterConfig, PeripheralEvent,
    PowerState, SharedBroadcaster, SimulatedPeripheral, StaticIdentityProvider,
};

use crate::cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    let config = cli.apply_overrides(load_configuration(&cli)?);
    info!(
        "broadcasting service {} (local name {})",
        config.service_uuid,
        if config.include_local_name { "advertised" } else { "hidden" }
    );

    let (events_tx, events_rx) = event_channel();
    let mut peripheral = SimulatedPeripheral::new().with_event_sender(events_tx.clone());
    peripheral.set_state(PowerState::PoweredOn);

    let identity = Arc::new(StaticIdentityProvider::new());
    let broadcaster = SharedBroadcaster::new(peripheral, identity.clone(), config);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let task = tokio::spawn(BroadcastTask::new(broadcaster.clone(), events_rx, shutdown_rx).run());

    rotate_identity(&identity);
    events_tx
        .send(PeripheralEvent::StateChanged(PowerState::PoweredOn))
        .context("broadcast task stopped before start")?;

    let mut rotation = tokio::time::interval(Duration::from_secs(cli.rotate_secs.max(1)));
    let mut health = tokio::time::interval(Duration::from_secs(cli.health_secs.max(1)));
    rotation.tick().await;
    let mut rotations: u32 = 0;

    loop {
        tokio::select! {
            _ = rotation.tick() => {
                rotations = rotations.wrapping_add(1);
                if cli.backpressure_every > 0 && rotations % cli.backpressure_every == 0 {
                    broadcaster.with(|b| b.transport_mut().backpressure_next(1));
                }
                rotate_identity(&identity);
                broadcaster.update_identity();
            }

            _ = health.tick() => {
                if broadcaster.is_healthy() {
                    info!("broadcaster healthy");
                } else {
                    warn!("broadcaster unhealthy");
                }
            }

            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for ctrl-c")?;
                info!("interrupted, shutting down");
                break;
            }
        }
    }

    // The task may already have stopped; its result is reported below.
    let _ = shutdown_tx.send(true);
    task.await
        .context("broadcast task panicked")?
        .context("broadcast task failed")?;

    info!("Sonar broadcaster exited successfully");
    Ok(())
}

/// Setup logging based on verbosity level
fn setup_logging(verbose: bool) {
    let log_level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

/// Load configuration from file or use defaults
fn load_configuration(cli: &Cli) -> anyhow::Result<BroadcasterConfig> {
    match &cli.config {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            BroadcasterConfig::load_from_file(path)
                .with_context(|| format!("failed to load {}", path.display()))
        }
        None => Ok(BroadcasterConfig::default()),
    }
}

fn rotate_identity(identity: &StaticIdentityProvider) {
    identity.set(Uuid::new_v4().as_bytes().to_vec());
}
