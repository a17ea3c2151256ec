//! Run command: the long-lived trigger daemon.

use super::{build_client, DEFAULT_CONFIG_PATH};
use anyhow::Result;
use clap::Args;
use fx_timebot_core::{ConfigLoader, IntervalTicker, TimeBot, TriggerEngine};
use fx_timebot_web_api::{LivenessServer, LivenessState};
use std::time::Duration;

/// Arguments for the run command.
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Config file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,

    /// Liveness port (overrides `server.port`)
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Do not start the liveness endpoint
    #[arg(long)]
    pub no_server: bool,
}

/// Runs the trigger loop until Ctrl-C.
///
/// # Errors
/// Returns an error if configuration is invalid or credentials are missing.
pub async fn run_bot(args: RunArgs) -> Result<()> {
    tracing::info!("Starting FX time trigger with config: {}", args.config);

    let mut config = ConfigLoader::load_from(&args.config)?;
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let client = build_client(&config)?;
    tracing::info!(
        environment = %client.environment(),
        base_url = client.base_url(),
        "OANDA client ready"
    );

    if config.server.enabled && !args.no_server {
        let addr = config.server.addr();
        let server = LivenessServer::new(LivenessState::new(config.engine.instrument.clone()));
        tokio::spawn(async move {
            if let Err(e) = server.serve(&addr).await {
                tracing::error!("Liveness endpoint on {} stopped: {}", addr, e);
            }
        });
    }

    let engine = TriggerEngine::new(config.engine)?;
    let mut bot = TimeBot::new(engine, client);
    let mut ticker = IntervalTicker::new(Duration::from_millis(config.scheduler.tick_interval_ms));

    tokio::select! {
        stats = bot.run(&mut ticker) => {
            tracing::warn!(?stats, "Tick source ended");
        }
        result = tokio::signal::ctrl_c() => {
            result?;
            tracing::info!("Shutdown signal received");
        }
    }

    tracing::info!(stats = ?bot.stats(), "FX time trigger stopped");
    Ok(())
}
