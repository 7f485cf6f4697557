use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tradekit_domain::repositories::artifacts::{RunSummary, SummaryHeader};
use tradekit_domain::services::features::FeatureTable;
use tradekit_domain::value_objects::equity_point::EquityPoint;
use tradekit_domain::value_objects::trade_record::{TradeDirection, TradeRecord, TradeStatus};

/// Row layout of `trades.csv`. Exit columns are blank for open trades.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TradeRow {
    entry_time: i64,
    exit_time: Option<i64>,
    symbol: String,
    direction: String,
    entry_price: f64,
    exit_price: Option<f64>,
    quantity: f64,
    entry_fee: f64,
    profit_loss: Option<f64>,
    profit_loss_pct: Option<f64>,
    status: String,
}

impl From<&TradeRecord> for TradeRow {
    fn from(trade: &TradeRecord) -> Self {
        Self {
            entry_time: trade.entry_time,
            exit_time: trade.exit_time,
            symbol: trade.symbol.clone(),
            direction: trade.direction.as_str().to_string(),
            entry_price: trade.entry_price,
            exit_price: trade.exit_price,
            quantity: trade.quantity,
            entry_fee: trade.entry_fee,
            profit_loss: trade.profit_loss,
            profit_loss_pct: trade.profit_loss_pct,
            status: trade.status.as_str().to_string(),
        }
    }
}

impl TryFrom<TradeRow> for TradeRecord {
    type Error = String;

    fn try_from(row: TradeRow) -> Result<Self, Self::Error> {
        Ok(Self {
            direction: TradeDirection::parse(&row.direction)?,
            status: TradeStatus::parse(&row.status)?,
            symbol: row.symbol,
            entry_time: row.entry_time,
            entry_price: row.entry_price,
            quantity: row.quantity,
            entry_fee: row.entry_fee,
            exit_time: row.exit_time,
            exit_price: row.exit_price,
            profit_loss: row.profit_loss,
            profit_loss_pct: row.profit_loss_pct,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct EquityRow {
    timestamp_utc: i64,
    equity: f64,
}

pub fn write_trades_csv(path: &Path, trades: &[TradeRecord]) -> Result<(), String> {
    let mut wtr = csv::Writer::from_path(path)
        .map_err(|err| format!("failed to create trades csv {}: {}", path.display(), err))?;
    if trades.is_empty() {
        // serialize() only emits headers alongside the first row
        wtr.write_record([
            "entry_time",
            "exit_time",
            "symbol",
            "direction",
            "entry_price",
            "exit_price",
            "quantity",
            "entry_fee",
            "profit_loss",
            "profit_loss_pct",
            "status",
        ])
        .map_err(|err| format!("failed to write trades csv header: {}", err))?;
    }
    for trade in trades {
        wtr.serialize(TradeRow::from(trade))
            .map_err(|err| format!("failed to write trades row: {}", err))?;
    }
    wtr.flush()
        .map_err(|err| format!("failed to flush trades csv: {}", err))
}

pub fn read_trades_csv(path: &Path) -> Result<Vec<TradeRecord>, String> {
    let mut rdr = csv::Reader::from_path(path)
        .map_err(|err| format!("failed to open trades csv {}: {}", path.display(), err))?;
    let mut trades = Vec::new();
    for result in rdr.deserialize::<TradeRow>() {
        let row = result.map_err(|err| format!("failed to parse trade record: {}", err))?;
        trades.push(TradeRecord::try_from(row)?);
    }
    Ok(trades)
}

pub fn write_equity_csv(path: &Path, points: &[EquityPoint]) -> Result<(), String> {
    let mut wtr = csv::Writer::from_path(path)
        .map_err(|err| format!("failed to create equity csv {}: {}", path.display(), err))?;
    wtr.write_record(["timestamp_utc", "equity"])
        .map_err(|err| format!("failed to write equity csv header: {}", err))?;
    for point in points {
        wtr.write_record([point.timestamp.to_string(), point.equity.to_string()])
            .map_err(|err| format!("failed to write equity row: {}", err))?;
    }
    wtr.flush()
        .map_err(|err| format!("failed to flush equity csv: {}", err))
}

pub fn read_equity_csv(path: &Path) -> Result<Vec<EquityPoint>, String> {
    let mut rdr = csv::Reader::from_path(path)
        .map_err(|err| format!("failed to open equity csv {}: {}", path.display(), err))?;
    let mut points = Vec::new();
    for result in rdr.deserialize::<EquityRow>() {
        let row = result.map_err(|err| format!("failed to parse equity record: {}", err))?;
        points.push(EquityPoint {
            timestamp: row.timestamp_utc,
            equity: row.equity,
        });
    }
    Ok(points)
}

pub fn write_summary_json(path: &Path, summary: &RunSummary<'_>) -> Result<(), String> {
    let json = serde_json::to_string_pretty(summary)
        .map_err(|err| format!("failed to serialize summary: {err}"))?;
    fs::write(path, json)
        .map_err(|err| format!("failed to write summary json {}: {}", path.display(), err))
}

pub fn read_summary_header(path: &Path) -> Result<SummaryHeader, String> {
    let contents = fs::read_to_string(path)
        .map_err(|err| format!("failed to read summary json {}: {}", path.display(), err))?;
    serde_json::from_str(&contents)
        .map_err(|err| format!("failed to parse summary json {}: {}", path.display(), err))
}

pub fn write_report_txt(path: &Path, report: &str) -> Result<(), String> {
    fs::write(path, report)
        .map_err(|err| format!("failed to write report {}: {}", path.display(), err))
}

/// One row per bar: timestamp, close, then every indicator column. Warm-up cells are blank.
pub fn write_features_csv(path: &Path, table: &FeatureTable) -> Result<(), String> {
    let mut wtr = csv::Writer::from_path(path)
        .map_err(|err| format!("failed to create features csv {}: {}", path.display(), err))?;
    let mut header = vec!["timestamp_utc".to_string(), "close".to_string()];
    header.extend(table.columns.iter().cloned());
    wtr.write_record(&header)
        .map_err(|err| format!("failed to write features csv header: {}", err))?;
    for row in &table.rows {
        let mut record = vec![row.timestamp.to_string(), row.close.to_string()];
        record.extend(
            row.values
                .iter()
                .map(|value| value.map(|v| v.to_string()).unwrap_or_default()),
        );
        wtr.write_record(&record)
            .map_err(|err| format!("failed to write features row: {}", err))?;
    }
    wtr.flush()
        .map_err(|err| format!("failed to flush features csv: {}", err))
}

#[cfg(test)]
mod tests {
    use super::{
        read_equity_csv, read_summary_header, read_trades_csv, write_equity_csv,
        write_features_csv, write_summary_json, write_trades_csv,
    };
    use std::fs;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};
    use tradekit_domain::entities::metrics::BacktestMetrics;
    use tradekit_domain::repositories::artifacts::{RunSummary, SummaryMeta};
    use tradekit_domain::services::features::{FeatureRow, FeatureTable};
    use tradekit_domain::services::strategy::params::{ParamValue, StrategyParams};
    use tradekit_domain::value_objects::equity_point::EquityPoint;
    use tradekit_domain::value_objects::trade_record::{TradeDirection, TradeRecord};

    fn unique_tmp_dir(prefix: &str) -> PathBuf {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        std::env::temp_dir().join(format!("tradekit_{prefix}_{}_{}", std::process::id(), now))
    }

    #[test]
    fn trades_csv_keeps_open_and_closed_trades() {
        let dir = unique_tmp_dir("trades_csv");
        fs::create_dir_all(&dir).expect("dir");
        let path = dir.join("trades.csv");

        let mut closed =
            TradeRecord::open("BTC/USDT", TradeDirection::Short, 3_600, 100.0, 10.0, 1.0);
        closed.close(7_200, 98.0, 0.98);
        let open =
            TradeRecord::open("BTC/USDT", TradeDirection::Long, 10_800, 99.5, 2.0, 0.199);

        write_trades_csv(&path, &[closed.clone(), open.clone()]).expect("write");
        let parsed = read_trades_csv(&path).expect("read");

        assert_eq!(parsed, vec![closed, open]);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn empty_trades_csv_still_has_a_header() {
        let dir = unique_tmp_dir("trades_empty");
        fs::create_dir_all(&dir).expect("dir");
        let path = dir.join("trades.csv");

        write_trades_csv(&path, &[]).expect("write");
        let contents = fs::read_to_string(&path).expect("contents");
        assert!(contents.starts_with("entry_time,exit_time,symbol"));
        assert!(read_trades_csv(&path).expect("read").is_empty());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn equity_csv_roundtrips() {
        let dir = unique_tmp_dir("equity_csv");
        fs::create_dir_all(&dir).expect("dir");
        let path = dir.join("equity.csv");
        let points = vec![
            EquityPoint { timestamp: 0, equity: 10_000.0 },
            EquityPoint { timestamp: 60, equity: 10_097.9 },
        ];

        write_equity_csv(&path, &points).expect("write");
        assert_eq!(read_equity_csv(&path).expect("read"), points);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn summary_header_reads_back_meta_and_params() {
        let dir = unique_tmp_dir("summary_json");
        fs::create_dir_all(&dir).expect("dir");
        let path = dir.join("summary.json");
        let meta = SummaryMeta {
            strategy: "moving_average".to_string(),
            symbol: "BTC/USDT".to_string(),
            timeframe: "1h".to_string(),
            start: 0,
            end: 86_400,
            initial_capital: 10_000.0,
            final_capital: 10_100.0,
            fee_rate: 0.001,
            slippage: 0.0005,
            position_size: 0.1,
            position_mode: "long_short".to_string(),
        };
        let metrics = BacktestMetrics {
            profit_factor: f64::INFINITY,
            ..BacktestMetrics::default()
        };
        let mut params = StrategyParams::new();
        params.insert("short_window".to_string(), ParamValue::Int(5));

        write_summary_json(
            &path,
            &RunSummary {
                meta: &meta,
                metrics: &metrics,
                params: &params,
            },
        )
        .expect("write");
        let contents = fs::read_to_string(&path).expect("contents");
        assert!(contents.contains("\"profit_factor\": \"inf\""));

        let header = read_summary_header(&path).expect("read");
        assert_eq!(header.meta, meta);
        assert_eq!(header.params, params);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn features_csv_leaves_warm_up_cells_blank() {
        let dir = unique_tmp_dir("features_csv");
        fs::create_dir_all(&dir).expect("dir");
        let path = dir.join("features.csv");
        let table = FeatureTable {
            columns: vec!["sma_2".to_string(), "obv".to_string()],
            rows: vec![
                FeatureRow {
                    timestamp: 0,
                    close: 10.0,
                    values: vec![None, Some(5.0)],
                },
                FeatureRow {
                    timestamp: 60,
                    close: 11.0,
                    values: vec![Some(10.5), Some(11.0)],
                },
            ],
        };

        write_features_csv(&path, &table).expect("write");
        let contents = fs::read_to_string(&path).expect("contents");
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines, vec!["timestamp_utc,close,sma_2,obv", "0,10,,5", "60,11,10.5,11"]);
        let _ = fs::remove_dir_all(&dir);
    }
}
