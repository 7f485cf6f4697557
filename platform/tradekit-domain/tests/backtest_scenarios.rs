use tradekit_domain::entities::ledger::{ExecutionConfig, PositionMode};
use tradekit_domain::entities::metrics::BacktestMetrics;
use tradekit_domain::services::engine::backtest::{BacktestRunner, RunContext};
use tradekit_domain::services::report::render_report;
use tradekit_domain::services::strategy::params::StrategyParams;
use tradekit_domain::services::strategy::{HoldStrategy, Strategy};
use tradekit_domain::value_objects::bar::Bar;
use tradekit_domain::value_objects::signal::{Signal, SignalType};
use tradekit_domain::value_objects::trade_record::{TradeDirection, TradeRecord, TradeStatus};

const DAY: i64 = 86_400;

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

fn daily_bars(closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(idx, close)| Bar::flat("BTC/USDT", idx as i64 * DAY, *close))
        .collect()
}

fn context(mode: PositionMode) -> RunContext {
    RunContext::new("BTC/USDT", "1d", 10_000.0).with_execution(ExecutionConfig {
        fee_rate: 0.001,
        slippage: 0.0,
        position_size: 0.1,
        mode,
    })
}

fn directions(trades: &[TradeRecord]) -> Vec<TradeDirection> {
    trades.iter().map(|t| t.direction).collect()
}

fn buy_then_sell() -> Scripted {
    Scripted(vec![
        Signal::new("BTC/USDT", SignalType::Buy, 0, 100.0),
        Signal::new("BTC/USDT", SignalType::Sell, DAY, 110.0),
    ])
}

#[test]
fn single_round_trip_long_only() {
    let result = BacktestRunner::new(buy_then_sell(), context(PositionMode::LongOnly))
        .run(&daily_bars(&[100.0, 110.0]));

    assert_eq!(result.trades.len(), 1);
    let trade = &result.trades[0];
    assert_eq!(trade.direction, TradeDirection::Long);
    assert!((trade.quantity - 10.0).abs() < 1e-9);
    assert!((trade.entry_fee - 1.0).abs() < 1e-9);
    assert!((trade.profit_loss.unwrap() - 97.9).abs() < 1e-9);
    assert!((trade.profit_loss_pct.unwrap() - 10.0).abs() < 1e-9);
    assert!((result.final_capital - 10_097.9).abs() < 1e-9);

    let m = &result.metrics;
    assert_eq!(m.total_trades, 1);
    assert_eq!(m.winning_trades, 1);
    assert_eq!(m.losing_trades, 0);
    assert_eq!(m.win_rate, 100.0);
    assert!(m.profit_factor.is_infinite() && m.profit_factor > 0.0);
    // Total return reads the last curve sample, taken before the day-one sell.
    let equity: Vec<f64> = result.equity_curve.iter().map(|p| p.equity).collect();
    assert_eq!(equity, vec![10_000.0, 9_999.0]);
    assert!((m.total_return + 1.0).abs() < 1e-9);
    assert!((m.total_return_pct + 0.01).abs() < 1e-9);
    assert!((m.avg_trade_duration - 1.0).abs() < 1e-12);
}

#[test]
fn single_round_trip_long_short_reverses_then_force_closes() {
    let result = BacktestRunner::new(buy_then_sell(), context(PositionMode::LongShort))
        .run(&daily_bars(&[100.0, 110.0]));

    assert_eq!(result.trades.len(), 2);
    let first = &result.trades[0];
    assert!((first.profit_loss.unwrap() - 97.9).abs() < 1e-9);

    // The reversal short opens and is closed on the same final bar, so it only pays fees.
    let second = &result.trades[1];
    assert_eq!(second.direction, TradeDirection::Short);
    assert_eq!(second.exit_time, Some(DAY));
    assert!(second.profit_loss.unwrap() < 0.0);

    let m = &result.metrics;
    assert_eq!(m.total_trades, 2);
    assert_eq!(m.winning_trades, 1);
    assert_eq!(m.losing_trades, 1);
    assert_eq!(m.win_rate, 50.0);
    assert!(m.profit_factor.is_finite() && m.profit_factor > 1.0);
}

#[test]
fn no_signals_gives_flat_curve_and_default_metrics() {
    let bars = daily_bars(&[100.0, 105.0]);
    let result = BacktestRunner::new(HoldStrategy, context(PositionMode::LongShort)).run(&bars);

    let equity: Vec<f64> = result.equity_curve.iter().map(|p| p.equity).collect();
    assert_eq!(equity, vec![10_000.0, 10_000.0]);
    assert_eq!(result.metrics, BacktestMetrics::default());
    assert!(result.trades.is_empty());
    assert_eq!((result.start, result.end), (0, DAY));
}

#[test]
fn empty_price_series_is_degenerate_not_an_error() {
    let result = BacktestRunner::new(buy_then_sell(), context(PositionMode::LongShort)).run(&[]);
    assert!(result.equity_curve.is_empty());
    assert!(result.trades.is_empty());
    assert_eq!(result.start, result.end);
    assert!(result.start > 0);
    assert_eq!(result.metrics.total_trades, 0);
}

#[test]
fn open_position_is_closed_at_the_last_bar() {
    let strategy = Scripted(vec![Signal::new("BTC/USDT", SignalType::Buy, DAY, 100.0)]);
    let (result, stats) = BacktestRunner::new(strategy, context(PositionMode::LongShort))
        .run_with_stats(&daily_bars(&[90.0, 100.0, 120.0, 130.0]));

    assert!(stats.forced_close);
    assert_eq!(result.trades.len(), 1);
    let trade = &result.trades[0];
    assert_eq!(trade.status, TradeStatus::Closed);
    assert_eq!(trade.exit_time, Some(3 * DAY));
    assert_eq!(trade.exit_price, Some(130.0));
    assert!((result.metrics.avg_trade_duration - 2.0).abs() < 1e-12);
}

#[test]
fn only_winning_trades_have_infinite_profit_factor() {
    let strategy = Scripted(vec![
        Signal::new("BTC/USDT", SignalType::Buy, 0, 100.0),
        Signal::new("BTC/USDT", SignalType::Sell, DAY, 120.0),
        Signal::new("BTC/USDT", SignalType::Buy, 2 * DAY, 100.0),
        Signal::new("BTC/USDT", SignalType::Sell, 3 * DAY, 130.0),
    ]);
    let result = BacktestRunner::new(strategy, context(PositionMode::LongOnly))
        .run(&daily_bars(&[100.0, 120.0, 100.0, 130.0]));

    assert_eq!(result.metrics.total_trades, 2);
    assert_eq!(result.metrics.losing_trades, 0);
    assert!(result.metrics.profit_factor.is_infinite());
    assert_eq!(result.metrics.avg_loss, 0.0);
    assert!(render_report(&result).contains("Profit factor:      inf"));
}

#[test]
fn drawdown_reflects_marked_losses() {
    let strategy = Scripted(vec![Signal::new("BTC/USDT", SignalType::Buy, 0, 100.0)]);
    let result = BacktestRunner::new(strategy, context(PositionMode::LongOnly))
        .run(&daily_bars(&[100.0, 100.0, 50.0, 60.0]));

    assert!(result.metrics.max_drawdown > 0.0);
    assert!(result.metrics.max_drawdown_pct > 0.0);
    assert!(result.metrics.total_return < 0.0);
    assert_eq!(result.metrics.losing_trades, 1);
}

#[test]
fn total_return_matches_last_equity_sample_not_final_capital() {
    let strategy = Scripted(vec![
        Signal::new("BTC/USDT", SignalType::Buy, 0, 100.0),
        Signal::new("BTC/USDT", SignalType::Sell, 2 * DAY, 120.0),
    ]);
    let result = BacktestRunner::new(strategy, context(PositionMode::LongOnly))
        .run(&daily_bars(&[100.0, 110.0, 120.0]));

    let last = result.equity_curve.last().map(|p| p.equity).unwrap();
    // Bar 3 sees the mark from bar 2: 9_000 cash less the fee plus 10 units at 110.
    assert!((last - 10_099.0).abs() < 1e-9);
    assert!((result.metrics.total_return - (last - 10_000.0)).abs() < 1e-9);
    assert!(result.final_capital > last);
}

#[test]
fn same_bar_signals_apply_in_list_order() {
    let bars = daily_bars(&[100.0, 100.0]);
    let buy_then_sell = Scripted(vec![
        Signal::new("BTC/USDT", SignalType::Buy, 0, 100.0),
        Signal::new("BTC/USDT", SignalType::Sell, 0, 100.0),
    ]);
    let sell_then_buy = Scripted(vec![
        Signal::new("BTC/USDT", SignalType::Sell, 0, 100.0),
        Signal::new("BTC/USDT", SignalType::Buy, 0, 100.0),
    ]);

    let long_first =
        BacktestRunner::new(buy_then_sell, context(PositionMode::LongShort)).run(&bars);
    let short_first =
        BacktestRunner::new(sell_then_buy, context(PositionMode::LongShort)).run(&bars);

    // Each order opens one side, reverses on the same bar, then the reversal is force-closed.
    assert_eq!(
        directions(&long_first.trades),
        vec![TradeDirection::Long, TradeDirection::Short]
    );
    assert_eq!(
        directions(&short_first.trades),
        vec![TradeDirection::Short, TradeDirection::Long]
    );
    assert_eq!(long_first.trades[0].entry_time, 0);
    assert_eq!(long_first.trades[0].exit_time, Some(0));
    assert_eq!(long_first.trades[1].exit_time, Some(DAY));
    assert!(long_first.trades.iter().all(|t| t.status == TradeStatus::Closed));
}

#[test]
fn same_bar_signals_apply_in_list_order_long_only() {
    let bars = daily_bars(&[100.0, 100.0]);
    let buy_then_sell = Scripted(vec![
        Signal::new("BTC/USDT", SignalType::Buy, 0, 100.0),
        Signal::new("BTC/USDT", SignalType::Sell, 0, 100.0),
    ]);
    let sell_then_buy = Scripted(vec![
        Signal::new("BTC/USDT", SignalType::Sell, 0, 100.0),
        Signal::new("BTC/USDT", SignalType::Buy, 0, 100.0),
    ]);

    let (flat, flat_stats) =
        BacktestRunner::new(buy_then_sell, context(PositionMode::LongOnly)).run_with_stats(&bars);
    let (held, held_stats) =
        BacktestRunner::new(sell_then_buy, context(PositionMode::LongOnly)).run_with_stats(&bars);

    assert_eq!(flat.trades.len(), 1);
    assert_eq!(flat.trades[0].exit_time, Some(0));
    assert!(!flat_stats.forced_close);

    // The sell finds nothing to close, so the buy opens a long that runs to the end.
    assert_eq!(held.trades.len(), 1);
    assert_eq!(held.trades[0].entry_time, 0);
    assert_eq!(held.trades[0].exit_time, Some(DAY));
    assert!(held_stats.forced_close);
}

#[test]
fn timestamp_ties_keep_emission_order_after_sorting() {
    // Emitted out of order: the later bar comes first, then a buy/sell pair tied on bar 0.
    let strategy = Scripted(vec![
        Signal::new("BTC/USDT", SignalType::Buy, DAY, 110.0),
        Signal::new("BTC/USDT", SignalType::Buy, 0, 100.0),
        Signal::new("BTC/USDT", SignalType::Sell, 0, 100.0),
    ]);
    let (result, stats) = BacktestRunner::new(strategy, context(PositionMode::LongOnly))
        .run_with_stats(&daily_bars(&[100.0, 110.0]));

    assert_eq!(stats.signals_applied, 3);
    assert_eq!(result.trades.len(), 2);
    assert_eq!(result.trades[0].entry_time, 0);
    assert_eq!(result.trades[0].exit_time, Some(0));
    assert_eq!(result.trades[1].entry_time, DAY);
    assert_eq!(result.trades[1].entry_price, 110.0);
    assert!(stats.forced_close);
}
