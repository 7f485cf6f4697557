use crate::config::Config;
use crate::reporting::write_run_artifacts;
use crate::shared::load_replay_bars;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info_span;
use tradekit_domain::entities::backtest_result::BacktestResult;
use tradekit_domain::repositories::artifacts::ArtifactWriter;
use tradekit_domain::repositories::storage::DataStorage;
use tradekit_domain::services::engine::backtest::{BacktestRunner, RunContext, RunStats};
use tradekit_domain::services::ohlcv::DataQualityReport;
use tradekit_domain::services::report::render_report;
use tradekit_domain::services::strategy::params::StrategyParams;
use tradekit_domain::services::strategy::StrategyRegistry;

/// Per-invocation choices layered over the config file.
#[derive(Debug, Clone, Default)]
pub struct BacktestOverrides {
    pub strategy_kind: Option<String>,
    pub params: Option<StrategyParams>,
    pub data_name: Option<String>,
    pub days: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct BacktestOutcome {
    pub data_name: String,
    pub result: BacktestResult,
    pub stats: RunStats,
    pub quality: DataQualityReport,
    pub report: String,
    pub artifacts_dir: Option<PathBuf>,
}

pub fn run_backtest(
    config: &Config,
    overrides: &BacktestOverrides,
    registry: &StrategyRegistry,
    storage: &dyn DataStorage,
    artifacts: Option<(&dyn ArtifactWriter, &Path)>,
) -> Result<BacktestOutcome, String> {
    let kind = overrides
        .strategy_kind
        .clone()
        .unwrap_or_else(|| config.strategy.kind.clone());
    let params = overrides
        .params
        .clone()
        .unwrap_or_else(|| config.strategy.params.clone());
    let data_name = match &overrides.data_name {
        Some(name) => name.clone(),
        None => config.dataset_name()?,
    };

    let _span = info_span!(
        "run_backtest",
        strategy = %kind,
        data = %data_name,
        symbol = %config.run.symbol
    )
    .entered();

    let timeframe = config.timeframe()?;
    let strategy = registry.create(&kind, &params).ok_or_else(|| {
        format!(
            "could not create strategy '{}' (available: {})",
            kind,
            registry.available().join(", ")
        )
    })?;

    let (bars, quality) = load_replay_bars(
        storage,
        &data_name,
        overrides.days.or(config.run.days),
        Some(timeframe.step_seconds),
    )?;

    let execution = config.execution();
    let context = RunContext::new(
        &config.run.symbol,
        timeframe.as_str(),
        config.backtest.initial_capital,
    )
    .with_execution(execution);

    let stage_start = Instant::now();
    let (result, stats) = BacktestRunner::new(strategy, context).run_with_stats(&bars);
    metrics::histogram!("tradekit.backtest.run_ms")
        .record(stage_start.elapsed().as_millis() as f64);
    metrics::counter!("tradekit.backtest.bars").increment(stats.bars_processed as u64);
    metrics::counter!("tradekit.backtest.trades").increment(result.trades.len() as u64);
    metrics::counter!("tradekit.backtest.rejected_entries")
        .increment(stats.entries_rejected as u64);

    let artifacts_dir = match artifacts {
        Some((writer, out_dir)) => Some(write_run_artifacts(&result, &execution, out_dir, writer)?),
        None => None,
    };

    Ok(BacktestOutcome {
        data_name,
        report: render_report(&result),
        result,
        stats,
        quality,
        artifacts_dir,
    })
}
