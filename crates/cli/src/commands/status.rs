//! Status command: one-shot view of the clock gate and the broker.

use super::{build_client, DEFAULT_CONFIG_PATH};
use anyhow::Result;
use clap::Args;
use fx_timebot_core::{date_key, is_weekday, CalendarGate, ConfigLoader, EngineConfig};

/// Arguments for the status command.
#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    /// Config file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,
}

/// Prints local time, trading-day state, latest quote, and position.
///
/// Broker failures are printed in place so the clock section still shows.
///
/// # Errors
/// Returns an error if configuration is invalid or credentials are missing.
pub async fn run_status(args: StatusArgs) -> Result<()> {
    let config = ConfigLoader::load_from(&args.config)?;
    let engine = &config.engine;
    let gate = CalendarGate::new(&engine.timezone);
    let now = gate.local_now();

    println!("FX time trigger status");
    println!("  Instrument:   {}", engine.instrument);
    println!(
        "  Local time:   {} ({})",
        now.format("%Y-%m-%d %H:%M:%S %Z"),
        gate.timezone()
    );
    println!("  Date key:     {}", date_key(&now));
    println!(
        "  Trading day:  {}",
        trading_day_label(engine, is_weekday(&now))
    );
    println!(
        "  Entry:        {:02}:{:02} ({:?})",
        engine.entry_hour, engine.entry_minute, engine.entry_mode
    );
    println!(
        "  Force close:  {:02}:{:02}",
        engine.close_hour, engine.close_minute
    );

    let client = build_client(&config)?;
    match client.get_quote(&engine.instrument).await {
        Ok(quote) => println!(
            "  Quote:        bid {} / ask {} (spread {})",
            quote.bid,
            quote.ask,
            quote.spread()
        ),
        Err(e) => println!("  Quote:        unavailable ({e})"),
    }
    match client.has_open_long(&engine.instrument).await {
        Ok(open) => println!("  Open long:    {}", if open { "yes" } else { "no" }),
        Err(e) => println!("  Open long:    unknown ({e})"),
    }

    Ok(())
}

fn trading_day_label(engine: &EngineConfig, weekday: bool) -> &'static str {
    match (engine.weekdays_only, weekday) {
        (false, _) => "yes (weekends allowed)",
        (true, true) => "yes",
        (true, false) => "no (weekend)",
    }
}
