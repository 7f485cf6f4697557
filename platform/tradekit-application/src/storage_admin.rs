use tracing::{info, info_span};
use tradekit_domain::repositories::storage::{DataStorage, DatasetMetadata};
use tradekit_domain::services::ohlcv::{data_quality_from_bars, DataQualityReport};
use tradekit_domain::value_objects::timeframe::Timeframe;

#[derive(Debug, Clone)]
pub struct DatasetListing {
    pub name: String,
    pub metadata: Option<DatasetMetadata>,
}

pub fn list_datasets(storage: &dyn DataStorage) -> Result<Vec<DatasetListing>, String> {
    let _span = info_span!("list_datasets", backend = storage.backend()).entered();
    let names = storage
        .list_data()
        .map_err(|err| format!("failed to list datasets: {err}"))?;
    names
        .into_iter()
        .map(|name| {
            let metadata = storage
                .get_metadata(&name)
                .map_err(|err| format!("failed to read metadata for {name}: {err}"))?;
            Ok(DatasetListing { name, metadata })
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct DatasetInfo {
    pub name: String,
    pub metadata: Option<DatasetMetadata>,
    pub rows: usize,
    pub first_timestamp: Option<i64>,
    pub last_timestamp: Option<i64>,
    pub quality: DataQualityReport,
}

pub fn dataset_info(storage: &dyn DataStorage, name: &str) -> Result<DatasetInfo, String> {
    let _span = info_span!("dataset_info", backend = storage.backend(), name).entered();
    let metadata = storage
        .get_metadata(name)
        .map_err(|err| format!("failed to read metadata for {name}: {err}"))?;
    let bars = storage
        .load_data(name)
        .map_err(|err| format!("failed to load dataset {name}: {err}"))?;
    let step = metadata
        .as_ref()
        .and_then(|meta| Timeframe::parse(&meta.timeframe).ok())
        .map(|tf| tf.step_seconds);
    Ok(DatasetInfo {
        name: name.to_string(),
        rows: bars.len(),
        first_timestamp: bars.first().map(|bar| bar.timestamp),
        last_timestamp: bars.last().map(|bar| bar.timestamp),
        quality: data_quality_from_bars(&bars, step),
        metadata,
    })
}

pub fn delete_dataset(storage: &dyn DataStorage, name: &str) -> Result<bool, String> {
    let _span = info_span!("delete_dataset", backend = storage.backend(), name).entered();
    let deleted = storage
        .delete_data(name)
        .map_err(|err| format!("failed to delete dataset {name}: {err}"))?;
    info!(deleted, "delete finished");
    Ok(deleted)
}
