use crate::entities::metrics::BacktestMetrics;
use crate::services::strategy::params::StrategyParams;
use crate::value_objects::equity_point::EquityPoint;
use crate::value_objects::trade_record::TradeRecord;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryMeta {
    pub strategy: String,
    pub symbol: String,
    pub timeframe: String,
    pub start: i64,
    pub end: i64,
    pub initial_capital: f64,
    pub final_capital: f64,
    pub fee_rate: f64,
    pub slippage: f64,
    pub position_size: f64,
    pub position_mode: String,
}

/// Shape of `summary.json`.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary<'a> {
    pub meta: &'a SummaryMeta,
    pub metrics: &'a BacktestMetrics,
    pub params: &'a StrategyParams,
}

/// The parts of `summary.json` needed to rebuild a report.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SummaryHeader {
    pub meta: SummaryMeta,
    #[serde(default)]
    pub params: StrategyParams,
}

pub trait ArtifactWriter {
    fn ensure_dir(&self, path: &Path) -> Result<(), String>;
    fn write_trades_csv(&self, path: &Path, trades: &[TradeRecord]) -> Result<(), String>;
    fn write_equity_csv(&self, path: &Path, points: &[EquityPoint]) -> Result<(), String>;
    fn write_summary_json(&self, path: &Path, summary: &RunSummary<'_>) -> Result<(), String>;
    fn write_report_txt(&self, path: &Path, report: &str) -> Result<(), String>;
}

pub trait ArtifactReader {
    fn read_trades_csv(&self, path: &Path) -> Result<Vec<TradeRecord>, String>;
    fn read_equity_csv(&self, path: &Path) -> Result<Vec<EquityPoint>, String>;
    fn read_summary_header(&self, path: &Path) -> Result<SummaryHeader, String>;
    fn exists(&self, path: &Path) -> bool;
}
