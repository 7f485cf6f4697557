use super::{list_with_suffix, record_storage_metrics};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info_span};
use tradekit_domain::repositories::storage::{
    sanitize_name, DataStorage, DatasetMetadata, StorageError,
};
use tradekit_domain::value_objects::bar::Bar;

const DATA_SUFFIX: &str = ".csv";
const META_SUFFIX: &str = ".meta.json";

/// Blank price or volume cells are missing values; they load as NaN and save as blank.
#[derive(Debug, Serialize, Deserialize)]
struct BarRow {
    timestamp_utc: i64,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: Option<f64>,
    volume: Option<f64>,
    symbol: String,
}

fn cell(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

/// `<base>/<name>.csv` plus an optional `<base>/<name>.meta.json` sidecar.
#[derive(Debug, Clone)]
pub struct CsvStorage {
    base: PathBuf,
}

impl CsvStorage {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    fn data_path(&self, name: &str) -> Result<PathBuf, StorageError> {
        Ok(self.base.join(format!("{}{DATA_SUFFIX}", sanitize_name(name)?)))
    }

    fn meta_path(&self, name: &str) -> Result<PathBuf, StorageError> {
        Ok(self.base.join(format!("{}{META_SUFFIX}", sanitize_name(name)?)))
    }

    fn save_inner(
        &self,
        bars: &[Bar],
        name: &str,
        metadata: Option<&DatasetMetadata>,
    ) -> Result<(), StorageError> {
        if bars.is_empty() {
            return Err(StorageError::EmptyData(name.to_string()));
        }
        fs::create_dir_all(&self.base)?;
        let path = self.data_path(name)?;
        let mut wtr = ::csv::Writer::from_path(&path)
            .map_err(|err| StorageError::Serialization(format!("{}: {err}", path.display())))?;
        for bar in bars {
            wtr.serialize(BarRow {
                timestamp_utc: bar.timestamp,
                open: cell(bar.open),
                high: cell(bar.high),
                low: cell(bar.low),
                close: cell(bar.close),
                volume: cell(bar.volume),
                symbol: bar.symbol.clone(),
            })
            .map_err(|err| StorageError::Serialization(err.to_string()))?;
        }
        wtr.flush()?;

        let meta_path = self.meta_path(name)?;
        match metadata {
            Some(meta) => {
                let json = serde_json::to_string_pretty(meta)
                    .map_err(|err| StorageError::Serialization(err.to_string()))?;
                fs::write(&meta_path, json)?;
            }
            // stale sidecar would describe the previous contents
            None if meta_path.exists() => fs::remove_file(&meta_path)?,
            None => {}
        }
        debug!(path = %path.display(), rows = bars.len(), "saved csv dataset");
        Ok(())
    }

    fn load_inner(&self, name: &str) -> Result<Vec<Bar>, StorageError> {
        let path = self.data_path(name)?;
        if !path.exists() {
            return Err(StorageError::NotFound(name.to_string()));
        }
        let mut rdr = ::csv::Reader::from_path(&path)
            .map_err(|err| StorageError::Serialization(format!("{}: {err}", path.display())))?;
        let mut bars = Vec::new();
        for row in rdr.deserialize::<BarRow>() {
            let row = row.map_err(|err| {
                StorageError::Serialization(format!("{}: {err}", path.display()))
            })?;
            bars.push(Bar {
                symbol: row.symbol,
                timestamp: row.timestamp_utc,
                open: row.open.unwrap_or(f64::NAN),
                high: row.high.unwrap_or(f64::NAN),
                low: row.low.unwrap_or(f64::NAN),
                close: row.close.unwrap_or(f64::NAN),
                volume: row.volume.unwrap_or(f64::NAN),
            });
        }
        Ok(bars)
    }
}

impl DataStorage for CsvStorage {
    fn backend(&self) -> &'static str {
        "csv"
    }

    fn save_data(
        &self,
        bars: &[Bar],
        name: &str,
        metadata: Option<&DatasetMetadata>,
    ) -> Result<(), StorageError> {
        let _span = info_span!("infra.csv.save", name, rows = bars.len()).entered();
        let start = Instant::now();
        let result = self.save_inner(bars, name, metadata);
        record_storage_metrics("csv", "save", start, &result);
        result
    }

    fn load_data(&self, name: &str) -> Result<Vec<Bar>, StorageError> {
        let _span = info_span!("infra.csv.load", name).entered();
        let start = Instant::now();
        let result = self.load_inner(name);
        record_storage_metrics("csv", "load", start, &result);
        result
    }

    fn delete_data(&self, name: &str) -> Result<bool, StorageError> {
        let data_path = self.data_path(name)?;
        let meta_path = self.meta_path(name)?;
        let existed = data_path.exists();
        if existed {
            fs::remove_file(&data_path)?;
        }
        if meta_path.exists() {
            fs::remove_file(&meta_path)?;
        }
        Ok(existed)
    }

    fn list_data(&self) -> Result<Vec<String>, StorageError> {
        list_with_suffix(&self.base, DATA_SUFFIX)
    }

    fn get_metadata(&self, name: &str) -> Result<Option<DatasetMetadata>, StorageError> {
        let path = self.meta_path(name)?;
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&path)?;
        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|err| StorageError::Serialization(format!("{}: {err}", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::CsvStorage;
    use crate::storage::test_support::{sample_bars, unique_tmp_dir};
    use std::fs;
    use tradekit_domain::repositories::storage::{DataStorage, DatasetMetadata, StorageError};
    use tradekit_domain::value_objects::bar::Bar;

    #[test]
    fn save_then_load_keeps_every_column() {
        let dir = unique_tmp_dir("csv_store");
        let storage = CsvStorage::new(&dir);
        let bars = sample_bars();
        let meta = DatasetMetadata::describe(&bars, "BTC/USDT", "binance", "1h", "test");

        storage
            .save_data(&bars, "binance_BTC_USDT_1h", Some(&meta))
            .expect("save");

        assert_eq!(storage.load_data("binance_BTC_USDT_1h").expect("load"), bars);
        assert_eq!(
            storage.get_metadata("binance_BTC_USDT_1h").expect("meta"),
            Some(meta)
        );
        let header = fs::read_to_string(dir.join("binance_BTC_USDT_1h.csv"))
            .expect("file")
            .lines()
            .next()
            .map(str::to_string);
        assert_eq!(
            header.as_deref(),
            Some("timestamp_utc,open,high,low,close,volume,symbol")
        );
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn blank_cells_load_as_missing_values() {
        let dir = unique_tmp_dir("csv_blank");
        fs::create_dir_all(&dir).expect("dir");
        fs::write(
            dir.join("gappy.csv"),
            "timestamp_utc,open,high,low,close,volume,symbol\n\
             0,1.0,2.0,0.5,1.5,10,BTC/USDT\n\
             3600,,,,,,BTC/USDT\n",
        )
        .expect("write");
        let storage = CsvStorage::new(&dir);

        let bars = storage.load_data("gappy").expect("load");
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].close, 1.5);
        assert!(bars[1].close.is_nan() && bars[1].volume.is_nan());

        storage.save_data(&bars, "copy", None).expect("save");
        let written = fs::read_to_string(dir.join("copy.csv")).expect("file");
        assert!(written.contains("3600,,,,,,BTC/USDT"), "{written}");
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn list_skips_sidecars_and_delete_reports_absence() {
        let dir = unique_tmp_dir("csv_list");
        let storage = CsvStorage::new(&dir);
        let bars = sample_bars();
        let meta = DatasetMetadata::describe(&bars, "BTC/USDT", "okx", "1h", "test");
        storage.save_data(&bars, "b_set", Some(&meta)).expect("save b");
        storage.save_data(&bars, "a_set", None).expect("save a");

        assert_eq!(storage.list_data().expect("list"), vec!["a_set", "b_set"]);
        assert!(storage.delete_data("b_set").expect("delete"));
        assert!(!storage.delete_data("b_set").expect("delete again"));
        assert_eq!(storage.get_metadata("b_set").expect("meta"), None);
        assert_eq!(storage.list_data().expect("list"), vec!["a_set"]);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_and_empty_datasets_are_typed_errors() {
        let dir = unique_tmp_dir("csv_errors");
        let storage = CsvStorage::new(&dir);

        assert!(matches!(storage.load_data("nope"), Err(StorageError::NotFound(_))));
        assert!(matches!(
            storage.save_data(&[], "empty", None),
            Err(StorageError::EmptyData(_))
        ));
        assert!(matches!(
            storage.save_data(&sample_bars(), "   ", None),
            Err(StorageError::InvalidName(_))
        ));
        assert!(storage.list_data().expect("list of missing dir").is_empty());
    }

    #[test]
    fn append_merges_and_refreshes_metadata() {
        let dir = unique_tmp_dir("csv_append");
        let storage = CsvStorage::new(&dir);
        let bars = sample_bars();
        let meta = DatasetMetadata::describe(&bars[..2], "BTC/USDT", "binance", "1h", "test");
        storage.save_data(&bars[..2], "set", Some(&meta)).expect("save");

        let mut incoming: Vec<Bar> = bars[1..].to_vec();
        incoming[0].close = 1.0;
        let rows = storage.append_data(&incoming, "set").expect("append");

        assert_eq!(rows, 4);
        let loaded = storage.load_data("set").expect("load");
        assert_eq!(loaded[1].close, bars[1].close);
        let meta = storage.get_metadata("set").expect("meta").expect("present");
        assert_eq!(meta.rows, 4);
        assert_eq!(meta.end_time, Some(bars[3].timestamp));
        let _ = fs::remove_dir_all(&dir);
    }
}
