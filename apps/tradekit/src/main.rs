mod commands;
mod infra;
mod obs;

use clap::Parser;
use commands::Command;
use std::path::PathBuf;
use tradekit_application::config::{load_config, Config};

const CONFIG_ENV: &str = "TRADEKIT_CONFIG";

#[derive(Parser, Debug)]
#[command(name = "tradekit")]
#[command(about = "Download market data, inspect strategy signals, backtest and report.", version)]
struct Cli {
    /// Config file path (TOML). If omitted, uses env TRADEKIT_CONFIG, then built-in defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Serve Prometheus metrics on host:port while the command runs.
    #[arg(long, global = true)]
    metrics_addr: Option<String>,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();

    let config_path = cli.config.or_else(|| {
        std::env::var(CONFIG_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
    });
    let config = match config_path {
        Some(path) => load_config(&path),
        None => {
            let config = Config::default();
            config.validate().map(|_| config)
        }
    };
    let config = match config {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = obs::init_tracing(&config.logging.level, config.logging.format) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
    if let Err(err) = obs::init_metrics(cli.metrics_addr.as_deref()) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }

    if let Err(err) = commands::run(cli.command, &config) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
