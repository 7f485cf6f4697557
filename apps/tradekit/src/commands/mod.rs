mod backtest;
mod common;
mod download;
mod features;
mod process;
mod report;
mod signals;
mod storage;
mod strategies;

use clap::{Args, Subcommand};
use std::path::PathBuf;
use tradekit_application::config::Config;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch OHLCV bars from an exchange and store them.
    Download(DownloadArgs),
    /// Show the signals a strategy produces on a stored dataset.
    Signals(SignalsArgs),
    /// Fill gaps, smooth outliers and optionally resample a stored dataset.
    Process(ProcessArgs),
    /// Compute technical indicators over a stored dataset.
    Features(FeaturesArgs),
    /// Replay a stored dataset through a strategy and print the report.
    Backtest(BacktestArgs),
    /// Recompute metrics and rewrite the report of a previous backtest.
    Report {
        /// Directory holding trades.csv, equity.csv and summary.json.
        #[arg(long)]
        input: PathBuf,
    },
    /// Inspect or remove stored datasets.
    Storage {
        #[command(subcommand)]
        action: StorageAction,
    },
    /// List the available strategy kinds and their defaults.
    Strategies,
}

#[derive(Args, Debug)]
pub struct DownloadArgs {
    /// Exchange to query (defaults to run.exchange).
    #[arg(long)]
    pub exchange: Option<String>,
    /// Comma-separated symbols, e.g. BTC/USDT,ETH/USDT (defaults to run.symbol).
    #[arg(long, value_delimiter = ',')]
    pub symbols: Vec<String>,
    /// Comma-separated timeframes, e.g. 1h,15m (defaults to run.timeframe).
    #[arg(long, value_delimiter = ',')]
    pub timeframes: Vec<String>,
    /// Trailing window ending at --end (defaults to run.days).
    #[arg(long, conflicts_with = "start")]
    pub days: Option<u32>,
    /// Start date, YYYY-MM-DD or RFC 3339.
    #[arg(long)]
    pub start: Option<String>,
    /// End date, YYYY-MM-DD or RFC 3339 (defaults to now).
    #[arg(long)]
    pub end: Option<String>,
    /// Fetch and summarize without writing to storage.
    #[arg(long)]
    pub no_store: bool,
}

#[derive(Args, Debug)]
pub struct SignalsArgs {
    /// Strategy kind (defaults to strategy.kind).
    #[arg(long)]
    pub strategy: Option<String>,
    /// Strategy parameters as k=v,k2=v2 (defaults to strategy.params).
    #[arg(long)]
    pub params: Option<String>,
    /// Stored dataset (defaults to run.data_name or the download name).
    #[arg(long)]
    pub data_name: Option<String>,
    /// Only the trailing N days of the dataset.
    #[arg(long)]
    pub days: Option<u32>,
    /// How many signals to print.
    #[arg(long, default_value_t = 10)]
    pub limit: usize,
}

#[derive(Args, Debug)]
pub struct BacktestArgs {
    #[arg(long)]
    pub strategy: Option<String>,
    #[arg(long)]
    pub params: Option<String>,
    #[arg(long)]
    pub data_name: Option<String>,
    #[arg(long)]
    pub days: Option<u32>,
    /// Write trades.csv, equity.csv, summary.json and report.txt here.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ProcessArgs {
    /// Source dataset (defaults to run.data_name or the download name).
    #[arg(long)]
    pub data_name: Option<String>,
    /// Gap filling: ffill, bfill or interpolate.
    #[arg(long, default_value = "ffill")]
    pub fill: String,
    /// Coarser timeframe to aggregate into, e.g. 4h.
    #[arg(long)]
    pub resample: Option<String>,
    /// Target dataset name (defaults to <source>_<timeframe> or <source>_clean).
    #[arg(long)]
    pub save_as: Option<String>,
}

#[derive(Args, Debug)]
pub struct FeaturesArgs {
    #[arg(long)]
    pub data_name: Option<String>,
    /// Comma-separated indicators, e.g. sma,rsi,macd (defaults to all).
    #[arg(long, value_delimiter = ',')]
    pub indicators: Vec<String>,
    #[arg(long)]
    pub days: Option<u32>,
    /// Write the full table as CSV.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum StorageAction {
    /// List datasets with their metadata.
    List,
    /// Show metadata and data quality of one dataset.
    Info { name: String },
    /// Delete a dataset.
    Delete { name: String },
}

pub fn run(command: Command, config: &Config) -> Result<(), String> {
    match command {
        Command::Download(args) => download::run_download(args, config),
        Command::Signals(args) => signals::run_signals(args, config),
        Command::Process(args) => process::run_process(args, config),
        Command::Features(args) => features::run_features(args, config),
        Command::Backtest(args) => backtest::run_backtest(args, config),
        Command::Report { input } => report::run_report(input),
        Command::Storage { action } => storage::run_storage(action, config),
        Command::Strategies => strategies::run_strategies(),
    }
}
