//! `DataStorage` backends: flat CSV files, one JSON document per dataset, and Postgres.

pub mod csv;
pub mod json;
pub mod postgres;

use std::fs;
use std::path::Path;
use tradekit_domain::repositories::storage::StorageError;

pub use self::csv::CsvStorage;
pub use self::json::JsonDocumentStorage;
pub use self::postgres::PostgresStorage;

/// Names of files in `dir` ending with `suffix`, with the suffix stripped, sorted.
pub(crate) fn list_with_suffix(dir: &Path, suffix: &str) -> Result<Vec<String>, StorageError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let file_name = entry.file_name();
        let Some(file_name) = file_name.to_str() else {
            continue;
        };
        if let Some(name) = file_name.strip_suffix(suffix) {
            if !name.is_empty() && !name.ends_with(".meta") {
                names.push(name.to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}

pub(crate) fn record_storage_metrics<T>(
    backend: &'static str,
    op: &'static str,
    start: std::time::Instant,
    result: &Result<T, StorageError>,
) {
    let result_label = if result.is_ok() { "ok" } else { "err" };
    metrics::counter!(
        "tradekit.infra.storage.calls_total",
        "backend" => backend,
        "op" => op,
        "result" => result_label
    )
    .increment(1);
    metrics::histogram!("tradekit.infra.storage.op_ms", "backend" => backend, "op" => op)
        .record(start.elapsed().as_secs_f64() * 1000.0);
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};
    use tradekit_domain::value_objects::bar::Bar;

    pub fn unique_tmp_dir(prefix: &str) -> PathBuf {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        std::env::temp_dir().join(format!("tradekit_{prefix}_{}_{}", std::process::id(), now))
    }

    pub fn sample_bars() -> Vec<Bar> {
        (0..4)
            .map(|idx| Bar {
                symbol: "BTC/USDT".to_string(),
                timestamp: 1_700_000_000 + idx * 3_600,
                open: 100.0 + idx as f64,
                high: 101.5 + idx as f64,
                low: 99.25 + idx as f64,
                close: 100.5 + idx as f64,
                volume: 12.0 * (idx + 1) as f64,
            })
            .collect()
    }
}
