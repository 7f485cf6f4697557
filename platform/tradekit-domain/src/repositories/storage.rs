use crate::services::ohlcv::merge_bars;
use crate::value_objects::bar::Bar;
use crate::value_objects::time::{format_timestamp, now_timestamp};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("dataset not found: {0}")]
    NotFound(String),
    #[error("refusing to save empty dataset: {0}")]
    EmptyData(String),
    #[error("invalid dataset name: {0:?}")]
    InvalidName(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("database error: {0}")]
    Database(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetMetadata {
    pub symbol: String,
    pub exchange: String,
    pub timeframe: String,
    pub start_time: Option<i64>,
    pub end_time: Option<i64>,
    pub rows: usize,
    pub source: String,
    pub last_modified: String,
}

impl DatasetMetadata {
    pub fn describe(
        bars: &[Bar],
        symbol: &str,
        exchange: &str,
        timeframe: &str,
        source: &str,
    ) -> Self {
        Self {
            symbol: symbol.to_string(),
            exchange: exchange.to_string(),
            timeframe: timeframe.to_string(),
            start_time: bars.first().map(|bar| bar.timestamp),
            end_time: bars.last().map(|bar| bar.timestamp),
            rows: bars.len(),
            source: source.to_string(),
            last_modified: format_timestamp(now_timestamp()),
        }
    }

    /// Same labels, with row count and range taken from `bars`.
    pub fn refreshed(&self, bars: &[Bar]) -> Self {
        Self::describe(bars, &self.symbol, &self.exchange, &self.timeframe, &self.source)
    }
}

/// Replaces every character outside `[A-Za-z0-9_-]` with `_`.
pub fn sanitize_name(name: &str) -> Result<String, StorageError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(StorageError::InvalidName(name.to_string()));
    }
    Ok(trimmed
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect())
}

/// `binance_BTC_USDT_1h` for BTC/USDT hourly bars from binance.
pub fn dataset_name(exchange: &str, symbol: &str, timeframe: &str) -> String {
    format!("{}_{}_{}", exchange, symbol.replace('/', "_"), timeframe)
}

/// Named OHLCV datasets, whatever the backend.
pub trait DataStorage {
    fn backend(&self) -> &'static str;

    fn save_data(
        &self,
        bars: &[Bar],
        name: &str,
        metadata: Option<&DatasetMetadata>,
    ) -> Result<(), StorageError>;

    fn load_data(&self, name: &str) -> Result<Vec<Bar>, StorageError>;

    /// `Ok(false)` when there was nothing to delete.
    fn delete_data(&self, name: &str) -> Result<bool, StorageError>;

    fn list_data(&self) -> Result<Vec<String>, StorageError>;

    fn get_metadata(&self, name: &str) -> Result<Option<DatasetMetadata>, StorageError>;

    /// Merges `bars` into the stored dataset, keeping stored rows on timestamp clashes.
    /// Returns the row count after the merge.
    fn append_data(&self, bars: &[Bar], name: &str) -> Result<usize, StorageError> {
        let existing = match self.load_data(name) {
            Ok(existing) => existing,
            Err(StorageError::NotFound(_)) => Vec::new(),
            Err(err) => return Err(err),
        };
        let metadata = self.get_metadata(name)?;
        let merged = merge_bars(existing, bars.to_vec());
        let metadata = metadata.map(|meta| meta.refreshed(&merged));
        self.save_data(&merged, name, metadata.as_ref())?;
        Ok(merged.len())
    }
}
