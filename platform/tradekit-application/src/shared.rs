use std::time::Instant;
use tracing::warn;
use tradekit_domain::repositories::storage::DataStorage;
use tradekit_domain::services::ohlcv::{
    canonicalize_bars, data_quality_from_bars, filter_range, DataQualityReport,
};
use tradekit_domain::value_objects::bar::Bar;

/// Loads a dataset ready for replay: sorted, deduplicated, optionally cut to the
/// trailing `days` before its last bar.
pub fn load_replay_bars(
    storage: &dyn DataStorage,
    name: &str,
    days: Option<u32>,
    expected_step: Option<i64>,
) -> Result<(Vec<Bar>, DataQualityReport), String> {
    let stage_start = Instant::now();
    let bars = storage
        .load_data(name)
        .map_err(|err| format!("failed to load dataset {name}: {err}"))?;
    metrics::histogram!("tradekit.storage.load_ms")
        .record(stage_start.elapsed().as_millis() as f64);

    let report = data_quality_from_bars(&bars, expected_step);
    let bars = if report.duplicates > 0 || report.out_of_order > 0 {
        warn!(
            dataset = name,
            duplicates = report.duplicates,
            out_of_order = report.out_of_order,
            "dataset not canonical, sorting and dropping duplicates"
        );
        canonicalize_bars(bars)
    } else {
        bars
    };

    let bars = match (days, bars.last().map(|bar| bar.timestamp)) {
        (Some(days), Some(last)) => {
            filter_range(bars, Some(last - i64::from(days) * 86_400), None)
        }
        _ => bars,
    };
    if bars.is_empty() {
        return Err(format!("dataset {name} has no bars to replay"));
    }
    Ok((bars, report))
}
