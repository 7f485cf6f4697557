use crate::entities::backtest_result::BacktestResult;
use crate::entities::ledger::{ExecutionConfig, Ledger};
use crate::entities::metrics::{compute_metrics, MetricsInput};
use crate::services::strategy::Strategy;
use crate::value_objects::bar::Bar;
use crate::value_objects::equity_point::EquityPoint;
use crate::value_objects::signal::{Signal, SignalMetadata, SignalType};
use crate::value_objects::time::now_timestamp;
use tracing::{debug, info, info_span, warn};

/// Labels and money settings for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunContext {
    pub symbol: String,
    pub timeframe: String,
    pub initial_capital: f64,
    pub execution: ExecutionConfig,
}

impl RunContext {
    pub fn new(symbol: &str, timeframe: &str, initial_capital: f64) -> Self {
        Self {
            symbol: symbol.to_string(),
            timeframe: timeframe.to_string(),
            initial_capital,
            execution: ExecutionConfig::default(),
        }
    }

    pub fn with_execution(mut self, execution: ExecutionConfig) -> Self {
        self.execution = execution;
        self
    }
}

/// Counters gathered while replaying, reported alongside the result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub bars_processed: usize,
    pub signals_generated: usize,
    pub signals_applied: usize,
    pub entries_rejected: usize,
    pub forced_close: bool,
}

pub struct BacktestRunner<S>
where
    S: Strategy,
{
    strategy: S,
    context: RunContext,
}

impl<S> BacktestRunner<S>
where
    S: Strategy,
{
    pub fn new(strategy: S, context: RunContext) -> Self {
        Self { strategy, context }
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    pub fn run(&self, bars: &[Bar]) -> BacktestResult {
        self.run_with_stats(bars).0
    }

    /// Bars must already be sorted and deduplicated; they are replayed as given.
    pub fn run_with_stats(&self, bars: &[Bar]) -> (BacktestResult, RunStats) {
        let span = info_span!(
            "backtest",
            strategy = self.strategy.name(),
            symbol = %self.context.symbol,
            bars = bars.len()
        );
        let _guard = span.enter();

        let mut stats = RunStats::default();
        let mut ledger = Ledger::new(self.context.initial_capital, self.context.execution);

        let mut signals = self.strategy.generate_signals(bars);
        stats.signals_generated = signals.len();
        if signals.is_empty() {
            warn!("strategy generated no signals");
            let equity_curve = bars
                .iter()
                .map(|bar| EquityPoint {
                    timestamp: bar.timestamp,
                    equity: self.context.initial_capital,
                })
                .collect();
            stats.bars_processed = bars.len();
            return (self.build_result(bars, ledger, equity_curve), stats);
        }
        // Stable, so equal timestamps keep emission order.
        signals.sort_by_key(|signal| signal.timestamp);

        let mut equity_curve = Vec::with_capacity(bars.len());
        let mut cursor = 0usize;
        for bar in bars {
            equity_curve.push(EquityPoint {
                timestamp: bar.timestamp,
                equity: ledger.equity(),
            });
            ledger.mark(bar.close);

            while cursor < signals.len() && signals[cursor].timestamp < bar.timestamp {
                cursor += 1;
            }
            while cursor < signals.len() && signals[cursor].timestamp == bar.timestamp {
                let signal = &signals[cursor];
                let outcome = ledger.process_signal(signal, bar.close);
                if outcome.rejected {
                    stats.entries_rejected += 1;
                }
                if !outcome.is_noop() {
                    stats.signals_applied += 1;
                    debug!(
                        signal = %signal,
                        capital = ledger.capital(),
                        position = ledger.position(),
                        "signal applied"
                    );
                }
                cursor += 1;
            }
            stats.bars_processed += 1;
        }

        if let Some(last) = bars.last() {
            if !ledger.is_flat() {
                let side = if ledger.position() > 0.0 {
                    SignalType::Sell
                } else {
                    SignalType::Buy
                };
                let close = Signal::new(&last.symbol, side, last.timestamp, last.close)
                    .with_metadata(SignalMetadata::close_position());
                ledger.process_signal(&close, last.close);
                stats.forced_close = true;
                debug!(signal = %close, "closed remaining position at end of data");
            }
        }

        let result = self.build_result(bars, ledger, equity_curve);
        info!(
            trades = result.metrics.total_trades,
            total_return_pct = result.metrics.total_return_pct,
            signals = stats.signals_generated,
            rejected = stats.entries_rejected,
            "backtest complete"
        );
        (result, stats)
    }

    fn build_result(
        &self,
        bars: &[Bar],
        ledger: Ledger,
        equity_curve: Vec<EquityPoint>,
    ) -> BacktestResult {
        let (start, end) = match (bars.first(), bars.last()) {
            (Some(first), Some(last)) => (first.timestamp, last.timestamp),
            _ => {
                let now = now_timestamp();
                (now, now)
            }
        };
        let final_capital = ledger.capital();
        let trades = ledger.into_trades();
        let metrics = compute_metrics(MetricsInput {
            trades: &trades,
            equity_curve: &equity_curve,
            initial_capital: self.context.initial_capital,
            start,
            end,
        });

        BacktestResult {
            strategy_name: self.strategy.name().to_string(),
            symbol: self.context.symbol.clone(),
            timeframe: self.context.timeframe.clone(),
            start,
            end,
            initial_capital: self.context.initial_capital,
            final_capital,
            params: self.strategy.params(),
            trades,
            equity_curve,
            metrics,
        }
    }
}

pub fn run_backtest<S: Strategy>(strategy: S, bars: &[Bar], context: RunContext) -> BacktestResult {
    BacktestRunner::new(strategy, context).run(bars)
}

#[cfg(test)]
mod tests {
    use super::{BacktestRunner, RunContext};
    use crate::services::strategy::params::StrategyParams;
    use crate::services::strategy::Strategy;
    use crate::value_objects::bar::Bar;
    use crate::value_objects::signal::{Signal, SignalType};

    struct Scripted(Vec<Signal>);

    impl Strategy for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        fn params(&self) -> StrategyParams {
            StrategyParams::new()
        }

        fn generate_signals(&self, _bars: &[Bar]) -> Vec<Signal> {
            self.0.clone()
        }
    }

    fn bars(closes: &[f64]) -> Vec<Bar> {
        closes
            .iter()
            .enumerate()
            .map(|(idx, close)| Bar::flat("BTC/USDT", idx as i64 * 60, *close))
            .collect()
    }

    #[test]
    fn run_counts_processed_bars_and_skips_unaligned_signals() {
        let strategy = Scripted(vec![
            Signal::new("BTC/USDT", SignalType::Buy, 30, 100.0),
            Signal::new("BTC/USDT", SignalType::Buy, 60, 100.0),
        ]);
        let runner = BacktestRunner::new(strategy, RunContext::new("BTC/USDT", "1m", 1_000.0));
        let (result, stats) = runner.run_with_stats(&bars(&[100.0, 100.0, 100.0]));
        assert_eq!(stats.bars_processed, 3);
        assert_eq!(stats.signals_generated, 2);
        assert_eq!(stats.signals_applied, 1);
        assert!(stats.forced_close);
        assert_eq!(result.trades.len(), 1);
        assert_eq!(result.equity_curve.len(), 3);
    }

    #[test]
    fn equity_is_sampled_before_the_bar_signals() {
        let strategy = Scripted(vec![Signal::new("BTC/USDT", SignalType::Buy, 0, 100.0)]);
        let mut context = RunContext::new("BTC/USDT", "1m", 1_000.0);
        context.execution.fee_rate = 0.0;
        context.execution.slippage = 0.0;
        context.execution.position_size = 0.5;
        let result = BacktestRunner::new(strategy, context).run(&bars(&[100.0, 120.0, 90.0]));

        let equity: Vec<f64> = result.equity_curve.iter().map(|p| p.equity).collect();
        // Bought 5 units at 100; bar 2 sees the mark from bar 1, bar 3 the mark from bar 2.
        assert_eq!(equity, vec![1_000.0, 1_000.0, 1_100.0]);
        assert!((result.final_capital - 950.0).abs() < 1e-9);
    }

    #[test]
    fn signals_out_of_order_are_sorted_before_replay() {
        let strategy = Scripted(vec![
            Signal::new("BTC/USDT", SignalType::Sell, 60, 110.0),
            Signal::new("BTC/USDT", SignalType::Buy, 0, 100.0),
        ]);
        let mut context = RunContext::new("BTC/USDT", "1m", 10_000.0);
        context.execution.mode = crate::entities::ledger::PositionMode::LongOnly;
        let result = BacktestRunner::new(strategy, context).run(&bars(&[100.0, 110.0]));
        assert_eq!(result.trades.len(), 1);
        assert!(result.trades[0].profit_loss.unwrap() > 0.0);
    }
}
