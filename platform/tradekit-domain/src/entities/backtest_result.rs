use crate::entities::metrics::{compute_metrics, BacktestMetrics, MetricsInput};
use crate::services::strategy::params::StrategyParams;
use crate::value_objects::equity_point::EquityPoint;
use crate::value_objects::trade_record::TradeRecord;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub strategy_name: String,
    pub symbol: String,
    pub timeframe: String,
    pub start: i64,
    pub end: i64,
    pub initial_capital: f64,
    pub final_capital: f64,
    pub params: StrategyParams,
    pub trades: Vec<TradeRecord>,
    pub equity_curve: Vec<EquityPoint>,
    pub metrics: BacktestMetrics,
}

impl BacktestResult {
    /// Recomputes the metrics from the trade list and equity curve.
    pub fn compute_metrics(&self) -> BacktestMetrics {
        compute_metrics(MetricsInput {
            trades: &self.trades,
            equity_curve: &self.equity_curve,
            initial_capital: self.initial_capital,
            start: self.start,
            end: self.end,
        })
    }

    pub fn last_sampled_equity(&self) -> f64 {
        self.equity_curve
            .last()
            .map(|point| point.equity)
            .unwrap_or(self.initial_capital)
    }
}
