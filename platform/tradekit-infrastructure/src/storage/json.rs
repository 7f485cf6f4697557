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

const DOC_SUFFIX: &str = ".json";

#[derive(Debug, Serialize, Deserialize)]
struct DatasetDocument {
    metadata: Option<DatasetMetadata>,
    bars: Vec<Bar>,
}

/// One `{metadata, bars}` document per dataset under `<base>/<name>.json`.
#[derive(Debug, Clone)]
pub struct JsonDocumentStorage {
    base: PathBuf,
}

impl JsonDocumentStorage {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    fn doc_path(&self, name: &str) -> Result<PathBuf, StorageError> {
        Ok(self.base.join(format!("{}{DOC_SUFFIX}", sanitize_name(name)?)))
    }

    fn read_document(&self, name: &str) -> Result<Option<DatasetDocument>, StorageError> {
        let path = self.doc_path(name)?;
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&path)?;
        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|err| StorageError::Serialization(format!("{}: {err}", path.display())))
    }
}

impl DataStorage for JsonDocumentStorage {
    fn backend(&self) -> &'static str {
        "json"
    }

    fn save_data(
        &self,
        bars: &[Bar],
        name: &str,
        metadata: Option<&DatasetMetadata>,
    ) -> Result<(), StorageError> {
        let _span = info_span!("infra.json.save", name, rows = bars.len()).entered();
        let start = Instant::now();
        let result = (|| {
            if bars.is_empty() {
                return Err(StorageError::EmptyData(name.to_string()));
            }
            fs::create_dir_all(&self.base)?;
            let path = self.doc_path(name)?;
            let doc = DatasetDocument {
                metadata: metadata.cloned(),
                bars: bars.to_vec(),
            };
            let json = serde_json::to_string(&doc)
                .map_err(|err| StorageError::Serialization(err.to_string()))?;
            fs::write(&path, json)?;
            debug!(path = %path.display(), rows = bars.len(), "saved json dataset");
            Ok(())
        })();
        record_storage_metrics("json", "save", start, &result);
        result
    }

    fn load_data(&self, name: &str) -> Result<Vec<Bar>, StorageError> {
        let _span = info_span!("infra.json.load", name).entered();
        let start = Instant::now();
        let result = self
            .read_document(name)
            .and_then(|doc| doc.ok_or_else(|| StorageError::NotFound(name.to_string())))
            .map(|doc| doc.bars);
        record_storage_metrics("json", "load", start, &result);
        result
    }

    fn delete_data(&self, name: &str) -> Result<bool, StorageError> {
        let path = self.doc_path(name)?;
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path)?;
        Ok(true)
    }

    fn list_data(&self) -> Result<Vec<String>, StorageError> {
        list_with_suffix(&self.base, DOC_SUFFIX)
    }

    fn get_metadata(&self, name: &str) -> Result<Option<DatasetMetadata>, StorageError> {
        Ok(self.read_document(name)?.and_then(|doc| doc.metadata))
    }
}

#[cfg(test)]
mod tests {
    use super::JsonDocumentStorage;
    use crate::storage::test_support::{sample_bars, unique_tmp_dir};
    use std::fs;
    use tradekit_domain::repositories::storage::{DataStorage, DatasetMetadata, StorageError};

    #[test]
    fn documents_hold_bars_and_metadata() {
        let dir = unique_tmp_dir("json_store");
        let storage = JsonDocumentStorage::new(&dir);
        let bars = sample_bars();
        let meta = DatasetMetadata::describe(&bars, "ETH/USDT", "okx", "15m", "test");

        storage.save_data(&bars, "okx ETH/USDT 15m", Some(&meta)).expect("save");

        assert!(dir.join("okx_ETH_USDT_15m.json").exists());
        assert_eq!(storage.list_data().expect("list"), vec!["okx_ETH_USDT_15m"]);
        assert_eq!(storage.load_data("okx ETH/USDT 15m").expect("load"), bars);
        assert_eq!(
            storage.get_metadata("okx_ETH_USDT_15m").expect("meta"),
            Some(meta)
        );
        assert!(storage.delete_data("okx_ETH_USDT_15m").expect("delete"));
        assert!(matches!(
            storage.load_data("okx_ETH_USDT_15m"),
            Err(StorageError::NotFound(_))
        ));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn dataset_without_metadata_reports_none() {
        let dir = unique_tmp_dir("json_nometa");
        let storage = JsonDocumentStorage::new(&dir);
        storage.save_data(&sample_bars(), "plain", None).expect("save");

        assert_eq!(storage.get_metadata("plain").expect("meta"), None);
        assert_eq!(storage.get_metadata("absent").expect("meta"), None);
        let _ = fs::remove_dir_all(&dir);
    }
}
