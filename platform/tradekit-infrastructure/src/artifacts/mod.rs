use crate::reporting;
use std::fs;
use std::path::Path;
use std::time::Instant;
use tradekit_domain::repositories::artifacts::{
    ArtifactReader, ArtifactWriter, RunSummary, SummaryHeader,
};
use tradekit_domain::services::features::FeatureTable;
use tradekit_domain::value_objects::equity_point::EquityPoint;
use tradekit_domain::value_objects::trade_record::TradeRecord;

#[derive(Debug, Default, Clone, Copy)]
pub struct FilesystemArtifactWriter;

impl FilesystemArtifactWriter {
    pub fn new() -> Self {
        Self
    }

    pub fn write_features_csv(&self, path: &Path, table: &FeatureTable) -> Result<(), String> {
        let start = Instant::now();
        let result = reporting::write_features_csv(path, table);
        record_write_metrics("features_csv", start, &result);
        result
    }
}

fn record_write_metrics(kind: &'static str, start: Instant, result: &Result<(), String>) {
    let result_label = if result.is_ok() { "ok" } else { "err" };
    metrics::counter!(
        "tradekit.infra.artifacts.write.calls_total",
        "kind" => kind,
        "result" => result_label
    )
    .increment(1);
    metrics::histogram!(
        "tradekit.infra.artifacts.write_ms",
        "kind" => kind,
        "result" => result_label
    )
    .record(start.elapsed().as_millis() as f64);
}

fn record_read_metrics<T>(kind: &'static str, start: Instant, result: &Result<T, String>) {
    let result_label = if result.is_ok() { "ok" } else { "err" };
    metrics::counter!(
        "tradekit.infra.artifacts.read.calls_total",
        "kind" => kind,
        "result" => result_label
    )
    .increment(1);
    metrics::histogram!(
        "tradekit.infra.artifacts.read_ms",
        "kind" => kind,
        "result" => result_label
    )
    .record(start.elapsed().as_millis() as f64);
}

impl ArtifactWriter for FilesystemArtifactWriter {
    fn ensure_dir(&self, path: &Path) -> Result<(), String> {
        let start = Instant::now();
        let result = fs::create_dir_all(path)
            .map_err(|err| format!("failed to create dir {}: {}", path.display(), err));
        record_write_metrics("ensure_dir", start, &result);
        result
    }

    fn write_trades_csv(&self, path: &Path, trades: &[TradeRecord]) -> Result<(), String> {
        let start = Instant::now();
        let result = reporting::write_trades_csv(path, trades);
        record_write_metrics("trades_csv", start, &result);
        result
    }

    fn write_equity_csv(&self, path: &Path, points: &[EquityPoint]) -> Result<(), String> {
        let start = Instant::now();
        let result = reporting::write_equity_csv(path, points);
        record_write_metrics("equity_csv", start, &result);
        result
    }

    fn write_summary_json(&self, path: &Path, summary: &RunSummary<'_>) -> Result<(), String> {
        let start = Instant::now();
        let result = reporting::write_summary_json(path, summary);
        record_write_metrics("summary_json", start, &result);
        result
    }

    fn write_report_txt(&self, path: &Path, report: &str) -> Result<(), String> {
        let start = Instant::now();
        let result = reporting::write_report_txt(path, report);
        record_write_metrics("report_txt", start, &result);
        result
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FilesystemArtifactReader;

impl FilesystemArtifactReader {
    pub fn new() -> Self {
        Self
    }
}

impl ArtifactReader for FilesystemArtifactReader {
    fn read_trades_csv(&self, path: &Path) -> Result<Vec<TradeRecord>, String> {
        let start = Instant::now();
        let result = reporting::read_trades_csv(path);
        record_read_metrics("trades_csv", start, &result);
        result
    }

    fn read_equity_csv(&self, path: &Path) -> Result<Vec<EquityPoint>, String> {
        let start = Instant::now();
        let result = reporting::read_equity_csv(path);
        record_read_metrics("equity_csv", start, &result);
        result
    }

    fn read_summary_header(&self, path: &Path) -> Result<SummaryHeader, String> {
        let start = Instant::now();
        let result = reporting::read_summary_header(path);
        record_read_metrics("summary_json", start, &result);
        result
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}
