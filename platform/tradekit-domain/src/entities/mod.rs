pub mod backtest_result;
pub mod ledger;
pub mod metrics;
