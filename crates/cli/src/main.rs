use clap::{Parser, Subcommand};

mod commands;

use commands::{RunArgs, ShowConfigArgs, StatusArgs};

#[derive(Parser)]
#[command(name = "fx-timebot")]
#[command(about = "Time-gated FX order trigger for OANDA", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the trigger loop with the liveness endpoint
    Run(RunArgs),
    /// Show local time, trading-day state, quote, and position
    Status(StatusArgs),
    /// Print the effective configuration after file and env overrides
    ShowConfig(ShowConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match cli.command {
        Commands::Run(args) => commands::run_bot(args).await?,
        Commands::Status(args) => commands::run_status(args).await?,
        Commands::ShowConfig(args) => commands::run_show_config(&args)?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_defaults() {
        let cli = Cli::try_parse_from(["fx-timebot", "run"]).unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.config, commands::DEFAULT_CONFIG_PATH);
        assert!(!args.no_server);
    }

    #[test]
    fn test_run_overrides() {
        let cli = Cli::try_parse_from([
            "fx-timebot",
            "run",
            "--config",
            "/etc/timebot.toml",
            "--port",
            "9090",
            "--no-server",
        ])
        .unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.config, "/etc/timebot.toml");
        assert_eq!(args.port, Some(9090));
        assert!(args.no_server);
    }

    #[test]
    fn test_show_config_subcommand_name() {
        let cli = Cli::try_parse_from(["fx-timebot", "show-config", "-c", "x.toml"]).unwrap();
        assert!(matches!(cli.command, Commands::ShowConfig(ref a) if a.config == "x.toml"));
    }

    #[test]
    fn test_unknown_subcommand_rejected() {
        assert!(Cli::try_parse_from(["fx-timebot", "backtest"]).is_err());
    }
}
