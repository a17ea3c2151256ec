//! Show-config command: prints the merged configuration.

use super::DEFAULT_CONFIG_PATH;
use anyhow::Result;
use clap::Args;
use fx_timebot_core::{AppConfig, ConfigLoader};

/// Arguments for the show-config command.
#[derive(Args, Debug, Clone)]
pub struct ShowConfigArgs {
    /// Config file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,
}

/// Prints the validated configuration as JSON. Credentials are not part of it.
///
/// # Errors
/// Returns an error if the configuration cannot be loaded or fails validation.
pub fn run_show_config(args: &ShowConfigArgs) -> Result<()> {
    let config = ConfigLoader::load_from(&args.config)?;
    println!("{}", render(&config)?);
    Ok(())
}

fn render(config: &AppConfig) -> Result<String> {
    Ok(serde_json::to_string_pretty(config)?)
}
