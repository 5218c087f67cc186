use anyhow::Result;
use clap::Parser;
use tracing::info;

use pulse_agent::agent::{config::Config, daemon};
use pulse_agent::utils;

#[derive(Parser)]
#[command(name = "pulse-agent", version, about = "Pulse GPIO lines on command from a WebSocket server")]
struct AppCli {
    /// Config file path (JSON); built-in defaults when omitted
    #[arg(short, long)]
    config: Option<String>,

    /// Server URL, overrides the config file
    #[arg(long)]
    url: Option<String>,

    /// Drive an in-memory actuator instead of the GPIO header
    #[arg(long)]
    simulate: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    utils::logging::init();

    let args = AppCli::parse();
    let mut config = Config::load(args.config.as_deref())?;
    if let Some(url) = args.url {
        config.url = url;
        config.validate()?;
    }
    info!(version = pulse_agent::VERSION, "config loaded");

    daemon::run(config, args.simulate).await
}
