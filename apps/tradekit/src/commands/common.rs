use tradekit_application::config::Config;
use tradekit_domain::services::ohlcv::DataQualityReport;
use tradekit_domain::services::strategy::params::{parse_strategy_params, StrategyParams};
use tradekit_domain::value_objects::time::format_timestamp;

pub(super) fn print_config_summary(command: &str, config: &Config) {
    println!(
        "tradekit: {} (symbol={}, timeframe={}, exchange={}, storage={:?}:{})",
        command,
        config.run.symbol,
        config.run.timeframe,
        config.run.exchange,
        config.storage.kind,
        config.storage.path
    );
}

pub(super) fn resolve_params(raw: Option<&str>, fallback: &StrategyParams) -> StrategyParams {
    match raw {
        Some(raw) => parse_strategy_params(raw),
        None => fallback.clone(),
    }
}

pub(super) fn print_quality(report: &DataQualityReport) {
    if report.is_clean() {
        return;
    }
    println!(
        "data quality: rows={}, duplicates={}, gaps={}, out_of_order={}, invalid_close={}, \
         first_gap={}",
        report.rows,
        report.duplicates,
        report.gaps,
        report.out_of_order,
        report.invalid_close,
        report
            .first_gap
            .map(format_timestamp)
            .unwrap_or_else(|| "none".to_string())
    );
}

#[cfg(test)]
mod tests {
    use super::resolve_params;
    use tradekit_domain::services::strategy::params::{ParamValue, StrategyParams};

    #[test]
    fn cli_params_replace_config_params() {
        let mut fallback = StrategyParams::new();
        fallback.insert("period".to_string(), ParamValue::Int(14));

        assert_eq!(resolve_params(None, &fallback), fallback);
        let parsed = resolve_params(Some("short_window=3,long_window=9"), &fallback);
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed.get("long_window"), Some(&ParamValue::Int(9)));
    }
}
