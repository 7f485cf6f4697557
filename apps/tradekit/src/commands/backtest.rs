use super::BacktestArgs;
use std::time::Instant;
use tradekit_application::backtesting::{run_backtest as run_backtest_use_case, BacktestOverrides};
use tradekit_application::config::Config;
use tradekit_domain::repositories::artifacts::ArtifactWriter;
use tradekit_domain::services::strategy::StrategyRegistry;

pub(super) fn run_backtest(args: BacktestArgs, config: &Config) -> Result<(), String> {
    super::common::print_config_summary("backtest", config);
    let overall_start = Instant::now();

    let storage = crate::infra::build_storage(config)?;
    let deps = crate::infra::build_reporting_deps();
    let overrides = BacktestOverrides {
        strategy_kind: args.strategy,
        params: args
            .params
            .as_deref()
            .map(|raw| super::common::resolve_params(Some(raw), &config.strategy.params)),
        data_name: args.data_name,
        days: args.days,
    };
    let artifacts: Option<(&dyn ArtifactWriter, &std::path::Path)> = args
        .out
        .as_deref()
        .map(|dir| (deps.writer.as_ref(), dir));

    let outcome = run_backtest_use_case(
        config,
        &overrides,
        &StrategyRegistry::with_builtin(),
        storage.as_ref(),
        artifacts,
    )?;

    super::common::print_quality(&outcome.quality);
    println!("{}", outcome.report);
    if outcome.stats.entries_rejected > 0 {
        println!(
            "note: {} entries rejected for insufficient capital",
            outcome.stats.entries_rejected
        );
    }
    if let Some(dir) = &outcome.artifacts_dir {
        println!("run output: {}", dir.display());
    }
    println!(
        "tradekit: backtest of {} total_ms={}",
        outcome.data_name,
        overall_start.elapsed().as_millis()
    );
    Ok(())
}
