use crate::entities::backtest_result::BacktestResult;
use crate::entities::metrics::BacktestMetrics;
use crate::services::strategy::params::format_params;
use crate::value_objects::time::format_timestamp;
use std::fmt;

const WIDE: usize = 50;

/// Header fields of a report, kept separate so a report can be rebuilt from artifacts.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportHeader {
    pub strategy_name: String,
    pub symbol: String,
    pub timeframe: String,
    pub start: i64,
    pub end: i64,
    pub initial_capital: f64,
    pub params: String,
}

impl ReportHeader {
    pub fn from_result(result: &BacktestResult) -> Self {
        Self {
            strategy_name: result.strategy_name.clone(),
            symbol: result.symbol.clone(),
            timeframe: result.timeframe.clone(),
            start: result.start,
            end: result.end,
            initial_capital: result.initial_capital,
            params: format_params(&result.params),
        }
    }
}

pub fn render_report(result: &BacktestResult) -> String {
    render_report_parts(&ReportHeader::from_result(result), &result.metrics)
}

pub fn render_report_parts(header: &ReportHeader, metrics: &BacktestMetrics) -> String {
    Report { header, metrics }.to_string()
}

struct Report<'a> {
    header: &'a ReportHeader,
    metrics: &'a BacktestMetrics,
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Report { header, metrics } = self;
        let heavy = "=".repeat(WIDE);
        let light = "-".repeat(WIDE);

        writeln!(f, "{heavy}")?;
        writeln!(f, "Backtest report: {}", header.strategy_name)?;
        writeln!(f, "{heavy}")?;
        writeln!(f, "Symbol:             {}", header.symbol)?;
        writeln!(f, "Timeframe:          {}", header.timeframe)?;
        writeln!(
            f,
            "Period:             {} ~ {}",
            format_timestamp(header.start),
            format_timestamp(header.end)
        )?;
        writeln!(f, "Initial capital:    {:.2}", header.initial_capital)?;
        writeln!(f, "Parameters:         {}", header.params)?;
        writeln!(f, "{light}")?;
        writeln!(f, "Performance:")?;
        writeln!(
            f,
            "Total return:       {:.2} ({:.2}%)",
            metrics.total_return, metrics.total_return_pct
        )?;
        writeln!(f, "Annualized return:  {:.2}%", metrics.annualized_return)?;
        writeln!(
            f,
            "Max drawdown:       {:.2} ({:.2}%)",
            metrics.max_drawdown, metrics.max_drawdown_pct
        )?;
        writeln!(f, "Sharpe ratio:       {:.2}", metrics.sharpe_ratio)?;
        writeln!(f, "Win rate:           {:.2}%", metrics.win_rate)?;
        writeln!(f, "Profit factor:      {}", format_ratio(metrics.profit_factor))?;
        writeln!(f, "{light}")?;
        writeln!(f, "Trades:")?;
        writeln!(f, "Total trades:       {}", metrics.total_trades)?;
        writeln!(f, "Winning trades:     {}", metrics.winning_trades)?;
        writeln!(f, "Losing trades:      {}", metrics.losing_trades)?;
        writeln!(
            f,
            "Average profit:     {:.2} ({:.2}%)",
            metrics.avg_profit, metrics.avg_profit_pct
        )?;
        writeln!(
            f,
            "Average loss:       {:.2} ({:.2}%)",
            metrics.avg_loss, metrics.avg_loss_pct
        )?;
        writeln!(f, "Average duration:   {:.2} days", metrics.avg_trade_duration)?;
        writeln!(f, "{heavy}")
    }
}

fn format_ratio(value: f64) -> String {
    if value.is_infinite() {
        "inf".to_string()
    } else {
        format!("{value:.2}")
    }
}
