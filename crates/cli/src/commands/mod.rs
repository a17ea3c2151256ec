//! CLI commands for the FX time trigger.

pub mod run;
pub mod show_config;
pub mod status;

pub use run::{run_bot, RunArgs};
pub use show_config::{run_show_config, ShowConfigArgs};
pub use status::{run_status, StatusArgs};

use anyhow::{anyhow, Result};
use fx_timebot_core::AppConfig;
use fx_timebot_oanda::{OandaClient, OandaClientConfig};
use std::num::NonZeroU32;

pub const DEFAULT_CONFIG_PATH: &str = fx_timebot_core::ConfigLoader::DEFAULT_PATH;

/// Builds the OANDA client from `OANDA_*` env vars and the `[broker]` section.
fn build_client(config: &AppConfig) -> Result<OandaClient> {
    let rate = NonZeroU32::new(config.broker.requests_per_second)
        .ok_or_else(|| anyhow!("broker.requests_per_second must be at least 1"))?;

    let client_config = OandaClientConfig::from_env()?
        .with_timeout_secs(config.broker.request_timeout_secs)
        .with_rate_limit(rate);

    Ok(OandaClient::new(client_config)?)
}
