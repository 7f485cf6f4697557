use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, info_span};
use tradekit_domain::entities::backtest_result::BacktestResult;
use tradekit_domain::entities::ledger::ExecutionConfig;
use tradekit_domain::entities::metrics::{compute_metrics, BacktestMetrics, MetricsInput};
use tradekit_domain::repositories::artifacts::{
    ArtifactReader, ArtifactWriter, RunSummary, SummaryMeta,
};
use tradekit_domain::services::report::{render_report, render_report_parts, ReportHeader};
use tradekit_domain::services::strategy::params::format_params;

pub const TRADES_FILE: &str = "trades.csv";
pub const EQUITY_FILE: &str = "equity.csv";
pub const SUMMARY_FILE: &str = "summary.json";
pub const REPORT_FILE: &str = "report.txt";

pub fn summary_meta(result: &BacktestResult, execution: &ExecutionConfig) -> SummaryMeta {
    SummaryMeta {
        strategy: result.strategy_name.clone(),
        symbol: result.symbol.clone(),
        timeframe: result.timeframe.clone(),
        start: result.start,
        end: result.end,
        initial_capital: result.initial_capital,
        final_capital: result.final_capital,
        fee_rate: execution.fee_rate,
        slippage: execution.slippage,
        position_size: execution.position_size,
        position_mode: execution.mode.as_str().to_string(),
    }
}

/// Writes trades.csv, equity.csv, summary.json and report.txt into `out_dir`.
pub fn write_run_artifacts(
    result: &BacktestResult,
    execution: &ExecutionConfig,
    out_dir: &Path,
    writer: &dyn ArtifactWriter,
) -> Result<PathBuf, String> {
    let _span = info_span!("write_run_artifacts", out_dir = %out_dir.display()).entered();
    let stage_start = Instant::now();

    writer.ensure_dir(out_dir)?;
    writer.write_trades_csv(&out_dir.join(TRADES_FILE), &result.trades)?;
    writer.write_equity_csv(&out_dir.join(EQUITY_FILE), &result.equity_curve)?;
    let meta = summary_meta(result, execution);
    writer.write_summary_json(
        &out_dir.join(SUMMARY_FILE),
        &RunSummary {
            meta: &meta,
            metrics: &result.metrics,
            params: &result.params,
        },
    )?;
    writer.write_report_txt(&out_dir.join(REPORT_FILE), &render_report(result))?;

    metrics::histogram!("tradekit.report.write_ms")
        .record(stage_start.elapsed().as_millis() as f64);
    Ok(out_dir.to_path_buf())
}

#[derive(Debug, Clone)]
pub struct RegeneratedReport {
    pub input_dir: PathBuf,
    pub meta: SummaryMeta,
    pub metrics: BacktestMetrics,
    pub report: String,
}

/// Recomputes metrics from stored artifacts and rewrites summary.json and report.txt.
pub fn regenerate_report(
    input_dir: &Path,
    reader: &dyn ArtifactReader,
    writer: &dyn ArtifactWriter,
) -> Result<RegeneratedReport, String> {
    let _span = info_span!("regenerate_report", input_dir = %input_dir.display()).entered();

    let stage_start = Instant::now();
    let trades_path = input_dir.join(TRADES_FILE);
    let equity_path = input_dir.join(EQUITY_FILE);
    let summary_path = input_dir.join(SUMMARY_FILE);
    for path in [&trades_path, &equity_path, &summary_path] {
        if !reader.exists(path) {
            return Err(format!("missing {} in {}", path.display(), input_dir.display()));
        }
    }

    let trades = reader.read_trades_csv(&trades_path)?;
    let equity = reader.read_equity_csv(&equity_path)?;
    let header = reader.read_summary_header(&summary_path)?;
    let metrics = compute_metrics(MetricsInput {
        trades: &trades,
        equity_curve: &equity,
        initial_capital: header.meta.initial_capital,
        start: header.meta.start,
        end: header.meta.end,
    });
    metrics::histogram!("tradekit.report.generate_ms")
        .record(stage_start.elapsed().as_millis() as f64);
    metrics::gauge!("tradekit.report.trades").set(trades.len() as f64);

    writer.write_summary_json(
        &summary_path,
        &RunSummary {
            meta: &header.meta,
            metrics: &metrics,
            params: &header.params,
        },
    )?;
    let report = render_report_parts(
        &ReportHeader {
            strategy_name: header.meta.strategy.clone(),
            symbol: header.meta.symbol.clone(),
            timeframe: header.meta.timeframe.clone(),
            start: header.meta.start,
            end: header.meta.end,
            initial_capital: header.meta.initial_capital,
            params: format_params(&header.params),
        },
        &metrics,
    );
    writer.write_report_txt(&input_dir.join(REPORT_FILE), &report)?;
    info!(trades = trades.len(), "report regenerated");

    Ok(RegeneratedReport {
        input_dir: input_dir.to_path_buf(),
        meta: header.meta,
        metrics,
        report,
    })
}
