use crate::value_objects::equity_point::EquityPoint;
use crate::value_objects::time::whole_days_between;
use crate::value_objects::trade_record::TradeRecord;
use serde::{Serialize, Serializer};

/// Performance summary of one backtest. Field names are part of the JSON summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BacktestMetrics {
    pub total_return: f64,
    pub total_return_pct: f64,
    pub annualized_return: f64,
    pub max_drawdown: f64,
    pub max_drawdown_pct: f64,
    pub sharpe_ratio: f64,
    pub win_rate: f64,
    #[serde(serialize_with = "serialize_unbounded")]
    pub profit_factor: f64,
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub avg_profit: f64,
    pub avg_loss: f64,
    pub avg_profit_pct: f64,
    pub avg_loss_pct: f64,
    pub avg_trade_duration: f64,
}

fn serialize_unbounded<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.is_infinite() {
        serializer.serialize_str(if *value > 0.0 { "inf" } else { "-inf" })
    } else {
        serializer.serialize_f64(*value)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MetricsInput<'a> {
    pub trades: &'a [TradeRecord],
    pub equity_curve: &'a [EquityPoint],
    pub initial_capital: f64,
    pub start: i64,
    pub end: i64,
}

/// Pure metrics computation. Only closed trades are counted.
pub fn compute_metrics(input: MetricsInput<'_>) -> BacktestMetrics {
    let closed: Vec<&TradeRecord> = input.trades.iter().filter(|t| t.is_closed()).collect();
    if closed.is_empty() {
        return BacktestMetrics::default();
    }

    let pnl = |t: &&TradeRecord| t.profit_loss.unwrap_or(0.0);
    let (winners, losers): (Vec<&TradeRecord>, Vec<&TradeRecord>) =
        closed.iter().partition(|t| pnl(t) > 0.0);

    let final_equity = input
        .equity_curve
        .last()
        .map(|point| point.equity)
        .unwrap_or(input.initial_capital);
    let total_return = final_equity - input.initial_capital;
    let total_return_pct = if input.initial_capital != 0.0 {
        total_return / input.initial_capital * 100.0
    } else {
        0.0
    };

    let (max_drawdown, max_drawdown_pct) = max_drawdown(input.equity_curve);
    let annualized_return =
        annualized_return(total_return_pct, whole_days_between(input.start, input.end));

    let gross_profit: f64 = winners.iter().map(pnl).sum();
    let gross_loss: f64 = losers.iter().map(pnl).sum::<f64>().abs();

    let durations: Vec<f64> = closed.iter().filter_map(|t| t.duration_days()).collect();

    BacktestMetrics {
        total_return,
        total_return_pct,
        annualized_return,
        max_drawdown,
        max_drawdown_pct,
        sharpe_ratio: sharpe_ratio(input.equity_curve),
        win_rate: winners.len() as f64 / closed.len() as f64 * 100.0,
        profit_factor: profit_factor(gross_profit, gross_loss),
        total_trades: closed.len(),
        winning_trades: winners.len(),
        losing_trades: losers.len(),
        avg_profit: mean_or_zero(gross_profit, winners.len()),
        avg_loss: mean_or_zero(gross_loss, losers.len()),
        avg_profit_pct: mean_or_zero(
            winners.iter().filter_map(|t| t.profit_loss_pct).sum(),
            winners.len(),
        ),
        avg_loss_pct: mean_or_zero(
            losers.iter().filter_map(|t| t.profit_loss_pct).sum(),
            losers.len(),
        ),
        avg_trade_duration: mean_or_zero(durations.iter().sum(), durations.len()),
    }
}

fn mean_or_zero(sum: f64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Largest peak-to-trough drop, as an amount and as a percentage of the peak.
pub fn max_drawdown(curve: &[EquityPoint]) -> (f64, f64) {
    let mut peak = f64::NEG_INFINITY;
    let mut max_dd = 0.0f64;
    let mut max_dd_pct = 0.0f64;
    for point in curve {
        peak = peak.max(point.equity);
        let drawdown = peak - point.equity;
        let drawdown_pct = if peak > 0.0 {
            drawdown / peak * 100.0
        } else {
            0.0
        };
        max_dd = max_dd.max(drawdown);
        max_dd_pct = max_dd_pct.max(drawdown_pct);
    }
    (max_dd, max_dd_pct)
}

pub fn annualized_return(total_return_pct: f64, days_elapsed: i64) -> f64 {
    if days_elapsed <= 0 {
        return 0.0;
    }
    let growth = (1.0 + total_return_pct / 100.0).powf(365.0 / days_elapsed as f64);
    let annualized = (growth - 1.0) * 100.0;
    if annualized.is_finite() {
        annualized
    } else {
        0.0
    }
}

/// Annualized with sqrt(365) over period-over-period equity changes, zero risk-free rate.
pub fn sharpe_ratio(curve: &[EquityPoint]) -> f64 {
    let returns: Vec<f64> = curve
        .windows(2)
        .filter(|pair| pair[0].equity != 0.0)
        .map(|pair| pair[1].equity / pair[0].equity - 1.0)
        .collect();
    if returns.len() < 2 {
        return 0.0;
    }

    let mean = returns.iter().sum::<f64>() / returns.len() as f64;
    let var = returns
        .iter()
        .map(|ret| {
            let diff = ret - mean;
            diff * diff
        })
        .sum::<f64>()
        / (returns.len() as f64 - 1.0);
    let std = var.sqrt();
    if std == 0.0 {
        return 0.0;
    }

    let sharpe = 365f64.sqrt() * mean / std;
    if sharpe.is_finite() {
        sharpe
    } else {
        0.0
    }
}

pub fn profit_factor(gross_profit: f64, gross_loss: f64) -> f64 {
    if gross_loss != 0.0 {
        gross_profit / gross_loss
    } else if gross_profit > 0.0 {
        f64::INFINITY
    } else {
        0.0
    }
}
