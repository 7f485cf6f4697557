use crate::shared::load_replay_bars;
use std::time::Instant;
use tracing::{info, info_span};
use tradekit_domain::repositories::storage::{DataStorage, DatasetMetadata};
use tradekit_domain::services::features::{build_features, FeatureConfig, FeatureTable};
use tradekit_domain::services::ohlcv::{
    clean_bars, data_quality_from_bars, resample_bars, CleaningReport, DataQualityReport,
    FillMethod,
};
use tradekit_domain::value_objects::timeframe::Timeframe;

#[derive(Debug, Clone)]
pub struct ProcessRequest {
    pub source: String,
    /// Defaults to `{source}_{timeframe}` when resampling, `{source}_clean` otherwise.
    pub target: Option<String>,
    pub fill: FillMethod,
    pub resample: Option<Timeframe>,
}

#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    pub dataset: String,
    pub input_rows: usize,
    pub rows: usize,
    pub cleaning: CleaningReport,
    pub quality: DataQualityReport,
}

/// Cleans a stored dataset, optionally resamples it to a coarser timeframe, and
/// saves the result under a new name. The source dataset is left untouched.
pub fn process_dataset(
    storage: &dyn DataStorage,
    request: &ProcessRequest,
) -> Result<ProcessOutcome, String> {
    let _span = info_span!(
        "process_dataset",
        backend = storage.backend(),
        source = %request.source,
        fill = request.fill.as_str()
    )
    .entered();

    let source_meta = storage
        .get_metadata(&request.source)
        .map_err(|err| format!("failed to read metadata for {}: {err}", request.source))?;
    let source_tf = source_meta
        .as_ref()
        .and_then(|meta| Timeframe::parse(&meta.timeframe).ok());

    if let (Some(target), Some(source_tf)) = (&request.resample, &source_tf) {
        if target.step_seconds < source_tf.step_seconds {
            return Err(format!(
                "cannot resample {} bars down to {}",
                source_tf, target
            ));
        }
    }

    let (bars, _) = load_replay_bars(
        storage,
        &request.source,
        None,
        source_tf.as_ref().map(|tf| tf.step_seconds),
    )?;
    let input_rows = bars.len();

    let stage_start = Instant::now();
    let (bars, cleaning) = clean_bars(bars, request.fill);
    let bars = match &request.resample {
        Some(target) => resample_bars(bars, target),
        None => bars,
    };
    metrics::histogram!("tradekit.process.transform_ms")
        .record(stage_start.elapsed().as_millis() as f64);
    if bars.is_empty() {
        return Err(format!(
            "dataset {} has no usable bars after cleaning",
            request.source
        ));
    }

    let timeframe = request.resample.as_ref().or(source_tf.as_ref());
    let dataset = request.target.clone().unwrap_or_else(|| match &request.resample {
        Some(tf) => format!("{}_{}", request.source, tf),
        None => format!("{}_clean", request.source),
    });
    if dataset == request.source {
        return Err(format!("refusing to overwrite source dataset {dataset}"));
    }

    let metadata = DatasetMetadata::describe(
        &bars,
        source_meta
            .as_ref()
            .map_or_else(|| bars[0].symbol.as_str(), |meta| meta.symbol.as_str()),
        source_meta
            .as_ref()
            .map_or("unknown", |meta| meta.exchange.as_str()),
        timeframe.map_or("unknown", |tf| tf.as_str()),
        &format!("processed:{}", request.source),
    );
    storage
        .save_data(&bars, &dataset, Some(&metadata))
        .map_err(|err| format!("failed to save dataset {dataset}: {err}"))?;

    let quality = data_quality_from_bars(&bars, timeframe.map(|tf| tf.step_seconds));
    metrics::counter!("tradekit.process.rows").increment(bars.len() as u64);
    metrics::counter!("tradekit.process.outliers").increment(cleaning.outliers as u64);
    info!(
        dataset = %dataset,
        input_rows,
        rows = bars.len(),
        filled = cleaning.filled,
        outliers = cleaning.outliers,
        dropped = cleaning.dropped,
        "process finished"
    );

    Ok(ProcessOutcome {
        dataset,
        input_rows,
        rows: bars.len(),
        cleaning,
        quality,
    })
}

/// Indicator table for a stored dataset, over the trailing `days` when given.
pub fn compute_features(
    storage: &dyn DataStorage,
    name: &str,
    config: &FeatureConfig,
    days: Option<u32>,
) -> Result<FeatureTable, String> {
    let _span = info_span!("compute_features", backend = storage.backend(), name).entered();
    let (bars, _) = load_replay_bars(storage, name, days, None)?;

    let stage_start = Instant::now();
    let table = build_features(&bars, config)?;
    metrics::histogram!("tradekit.features.build_ms")
        .record(stage_start.elapsed().as_millis() as f64);
    metrics::gauge!("tradekit.features.columns").set(table.columns.len() as f64);
    info!(
        rows = table.rows.len(),
        columns = table.columns.len(),
        "features computed"
    );
    Ok(table)
}
