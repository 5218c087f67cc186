use anyhow::{Context, Result};
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::agent::config::Config;
use crate::agent::events::AgentEvent;
use crate::commands::Dispatcher;
#[cfg(feature = "rpi")]
use crate::gpio::rpi::RpiActuator;
use crate::gpio::{prepare_lines, PinActuator, SimulatedActuator};
use crate::transport::websocket::connect_and_stream;

const EVENT_QUEUE_DEPTH: usize = 64;

#[cfg(feature = "rpi")]
fn build_actuator(config: &Config, simulate: bool) -> Result<Box<dyn PinActuator>> {
    if simulate {
        info!("using simulated gpio");
        return Ok(Box::new(SimulatedActuator::new()));
    }
    Ok(Box::new(RpiActuator::new(config.numbering)?))
}

#[cfg(not(feature = "rpi"))]
fn build_actuator(_config: &Config, simulate: bool) -> Result<Box<dyn PinActuator>> {
    if !simulate {
        warn!("built without the `rpi` feature, falling back to simulated gpio");
    }
    Ok(Box::new(SimulatedActuator::new()))
}

/// Set up the lines, connect once and dispatch commands until Ctrl+C.
pub async fn run(config: Config, simulate: bool) -> Result<()> {
    info!(
        url = %config.url,
        numbering = ?config.numbering,
        overlap = ?config.overlap,
        "pulse agent starting"
    );

    let mut actuator = build_actuator(&config, simulate)?;
    prepare_lines(&mut actuator, &config.pins)?;

    let (tx, rx) = mpsc::channel(EVENT_QUEUE_DEPTH);
    let dispatcher = Dispatcher::new(actuator, config.pins, tx.clone())
        .with_policy(config.overlap)
        .with_max_duration(config.max_duration());
    let dispatch_handle = tokio::spawn(dispatcher.run(rx));

    let url = config.url.clone();
    let transport_tx = tx.clone();
    let transport_handle = tokio::spawn(async move {
        if let Err(e) = connect_and_stream(&url, transport_tx).await {
            warn!(error = %e, "transport stopped");
        }
    });

    // A lost connection leaves the agent idle; only a signal ends it.
    signal::ctrl_c().await?;
    info!("shutdown signal received, stopping agent");

    transport_handle.abort();
    let _ = transport_handle.await; // Ignore cancellation errors

    tx.send(AgentEvent::Shutdown)
        .await
        .context("dispatcher already stopped")?;
    dispatch_handle.await.context("dispatcher task failed")??;
    Ok(())
}
