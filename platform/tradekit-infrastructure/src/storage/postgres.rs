use super::record_storage_metrics;
use ::postgres::NoTls;
use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_postgres::PostgresConnectionManager;
use std::time::Instant;
use tradekit_domain::repositories::storage::{
    sanitize_name, DataStorage, DatasetMetadata, StorageError,
};
use tradekit_domain::value_objects::bar::Bar;

pub const DEFAULT_DATASETS_TABLE: &str = "ohlcv_datasets";
pub const DEFAULT_BARS_TABLE: &str = "ohlcv_bars";

type PgPool = Pool<PostgresConnectionManager<NoTls>>;

/// Datasets as rows of `ohlcv_bars` keyed by `(dataset, timestamp_utc)`, with metadata in
/// `ohlcv_datasets`.
#[derive(Debug, Clone)]
pub struct PostgresStorage {
    pool: PgPool,
    pub datasets_table: String,
    pub bars_table: String,
}

impl PostgresStorage {
    pub fn new(db_url: &str, pool_max_size: u32) -> Result<Self, StorageError> {
        Self::with_tables(db_url, pool_max_size, DEFAULT_DATASETS_TABLE, DEFAULT_BARS_TABLE)
    }

    pub fn with_tables(
        db_url: &str,
        pool_max_size: u32,
        datasets_table: &str,
        bars_table: &str,
    ) -> Result<Self, StorageError> {
        for table in [datasets_table, bars_table] {
            validate_table_name(table).map_err(StorageError::Database)?;
        }
        let pool = build_pool(db_url, pool_max_size)?;
        let storage = Self {
            pool,
            datasets_table: datasets_table.to_string(),
            bars_table: bars_table.to_string(),
        };
        storage.ensure_schema()?;
        Ok(storage)
    }

    pub fn ensure_schema(&self) -> Result<(), StorageError> {
        let mut client = self.client()?;
        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS {datasets} (\
                name TEXT PRIMARY KEY, \
                symbol TEXT NOT NULL, \
                exchange TEXT NOT NULL, \
                timeframe TEXT NOT NULL, \
                start_time BIGINT, \
                end_time BIGINT, \
                row_count BIGINT NOT NULL, \
                source TEXT NOT NULL, \
                last_modified TEXT NOT NULL); \
             CREATE TABLE IF NOT EXISTS {bars} (\
                dataset TEXT NOT NULL, \
                timestamp_utc TIMESTAMPTZ NOT NULL, \
                symbol TEXT NOT NULL, \
                open DOUBLE PRECISION NOT NULL, \
                high DOUBLE PRECISION NOT NULL, \
                low DOUBLE PRECISION NOT NULL, \
                close DOUBLE PRECISION NOT NULL, \
                volume DOUBLE PRECISION NOT NULL, \
                PRIMARY KEY (dataset, timestamp_utc));",
            datasets = self.datasets_table,
            bars = self.bars_table
        );
        client
            .batch_execute(&ddl)
            .map_err(|err| db_error("failed to create schema", err))
    }

    fn client(&self) -> Result<PooledConnection<PostgresConnectionManager<NoTls>>, StorageError> {
        let get_start = Instant::now();
        let client = self.pool.get().map_err(|err| {
            metrics::counter!("tradekit.infra.postgres.pool.get.errors_total").increment(1);
            tracing::error!(error = %err, "failed to checkout postgres connection");
            StorageError::Database(format!("failed to checkout postgres connection: {err}"))
        })?;
        metrics::histogram!("tradekit.infra.postgres.pool.get_ms")
            .record(get_start.elapsed().as_secs_f64() * 1000.0);
        Ok(client)
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
        let name = sanitize_name(name)?;
        let mut client = self.client()?;
        let mut tx = client
            .transaction()
            .map_err(|err| db_error("failed to open transaction", err))?;

        tx.execute(
            &format!("DELETE FROM {} WHERE dataset = $1", self.bars_table),
            &[&name],
        )
        .map_err(|err| db_error("failed to clear dataset bars", err))?;
        let insert = tx
            .prepare(&format!(
                "INSERT INTO {} (dataset, timestamp_utc, symbol, open, high, low, close, volume) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
                 ON CONFLICT (dataset, timestamp_utc) DO NOTHING",
                self.bars_table
            ))
            .map_err(|err| db_error("failed to prepare insert", err))?;
        for bar in bars {
            let ts = to_datetime(bar.timestamp)?;
            tx.execute(
                &insert,
                &[
                    &name,
                    &ts,
                    &bar.symbol,
                    &bar.open,
                    &bar.high,
                    &bar.low,
                    &bar.close,
                    &bar.volume,
                ],
            )
            .map_err(|err| db_error("failed to insert bar", err))?;
        }

        tx.execute(
            &format!("DELETE FROM {} WHERE name = $1", self.datasets_table),
            &[&name],
        )
        .map_err(|err| db_error("failed to clear dataset metadata", err))?;
        if let Some(meta) = metadata {
            let row_count = meta.rows as i64;
            tx.execute(
                &format!(
                    "INSERT INTO {} (name, symbol, exchange, timeframe, start_time, end_time, \
                     row_count, source, last_modified) \
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
                    self.datasets_table
                ),
                &[
                    &name,
                    &meta.symbol,
                    &meta.exchange,
                    &meta.timeframe,
                    &meta.start_time,
                    &meta.end_time,
                    &row_count,
                    &meta.source,
                    &meta.last_modified,
                ],
            )
            .map_err(|err| db_error("failed to insert dataset metadata", err))?;
        }

        tx.commit()
            .map_err(|err| db_error("failed to commit dataset", err))?;
        tracing::debug!(dataset = %name, rows = bars.len(), "saved postgres dataset");
        Ok(())
    }

    fn load_inner(&self, name: &str) -> Result<Vec<Bar>, StorageError> {
        let name = sanitize_name(name)?;
        let mut client = self.client()?;
        let query_start = Instant::now();
        let rows = client
            .query(
                &format!(
                    "SELECT timestamp_utc, open, high, low, close, volume, symbol FROM {} \
                     WHERE dataset = $1 ORDER BY timestamp_utc ASC",
                    self.bars_table
                ),
                &[&name],
            )
            .map_err(|err| db_error("failed to query OHLCV", err))?;
        metrics::histogram!("tradekit.infra.postgres.query_ms")
            .record(query_start.elapsed().as_secs_f64() * 1000.0);

        if rows.is_empty() {
            return Err(StorageError::NotFound(name));
        }
        let bars: Vec<Bar> = rows
            .iter()
            .map(|row| {
                let timestamp: DateTime<Utc> = row.get(0);
                Bar {
                    timestamp: timestamp.timestamp(),
                    open: row.get(1),
                    high: row.get(2),
                    low: row.get(3),
                    close: row.get(4),
                    volume: row.get(5),
                    symbol: row.get(6),
                }
            })
            .collect();
        metrics::gauge!("tradekit.infra.postgres.load.bars_loaded").set(bars.len() as f64);
        Ok(bars)
    }
}

impl DataStorage for PostgresStorage {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    fn save_data(
        &self,
        bars: &[Bar],
        name: &str,
        metadata: Option<&DatasetMetadata>,
    ) -> Result<(), StorageError> {
        let _span = tracing::info_span!(
            "infra.postgres.save",
            table = %self.bars_table,
            name,
            rows = bars.len()
        )
        .entered();
        let start = Instant::now();
        let result = self.save_inner(bars, name, metadata);
        record_storage_metrics("postgres", "save", start, &result);
        result
    }

    fn load_data(&self, name: &str) -> Result<Vec<Bar>, StorageError> {
        let _span =
            tracing::info_span!("infra.postgres.load", table = %self.bars_table, name).entered();
        let start = Instant::now();
        let result = self.load_inner(name);
        record_storage_metrics("postgres", "load", start, &result);
        result
    }

    fn delete_data(&self, name: &str) -> Result<bool, StorageError> {
        let name = sanitize_name(name)?;
        let mut client = self.client()?;
        let mut tx = client
            .transaction()
            .map_err(|err| db_error("failed to open transaction", err))?;
        let bars_deleted = tx
            .execute(
                &format!("DELETE FROM {} WHERE dataset = $1", self.bars_table),
                &[&name],
            )
            .map_err(|err| db_error("failed to delete bars", err))?;
        let meta_deleted = tx
            .execute(
                &format!("DELETE FROM {} WHERE name = $1", self.datasets_table),
                &[&name],
            )
            .map_err(|err| db_error("failed to delete metadata", err))?;
        tx.commit()
            .map_err(|err| db_error("failed to commit delete", err))?;
        Ok(bars_deleted > 0 || meta_deleted > 0)
    }

    fn list_data(&self) -> Result<Vec<String>, StorageError> {
        let mut client = self.client()?;
        let rows = client
            .query(
                &format!(
                    "SELECT DISTINCT dataset FROM {} ORDER BY dataset",
                    self.bars_table
                ),
                &[],
            )
            .map_err(|err| db_error("failed to list datasets", err))?;
        Ok(rows.iter().map(|row| row.get(0)).collect())
    }

    fn get_metadata(&self, name: &str) -> Result<Option<DatasetMetadata>, StorageError> {
        let name = sanitize_name(name)?;
        let mut client = self.client()?;
        let row = client
            .query_opt(
                &format!(
                    "SELECT symbol, exchange, timeframe, start_time, end_time, row_count, \
                     source, last_modified FROM {} WHERE name = $1",
                    self.datasets_table
                ),
                &[&name],
            )
            .map_err(|err| db_error("failed to query metadata", err))?;
        Ok(row.map(|row| {
            let row_count: i64 = row.get(5);
            DatasetMetadata {
                symbol: row.get(0),
                exchange: row.get(1),
                timeframe: row.get(2),
                start_time: row.get(3),
                end_time: row.get(4),
                rows: row_count.max(0) as usize,
                source: row.get(6),
                last_modified: row.get(7),
            }
        }))
    }
}

fn build_pool(db_url: &str, pool_max_size: u32) -> Result<PgPool, StorageError> {
    let config = db_url
        .parse::<::postgres::Config>()
        .map_err(|err| StorageError::Database(format!("invalid postgres db url: {err}")))?;
    let manager = PostgresConnectionManager::new(config, NoTls);
    Pool::builder()
        .max_size(pool_max_size.max(1))
        .build(manager)
        .map_err(|err| StorageError::Database(format!("failed to build postgres pool: {err}")))
}

fn db_error(context: &str, err: ::postgres::Error) -> StorageError {
    metrics::counter!("tradekit.infra.postgres.errors_total").increment(1);
    tracing::error!(error = %err, "{context}");
    StorageError::Database(format!("{context}: {err}"))
}

fn to_datetime(timestamp: i64) -> Result<DateTime<Utc>, StorageError> {
    DateTime::<Utc>::from_timestamp(timestamp, 0)
        .ok_or_else(|| StorageError::Serialization(format!("timestamp out of range: {timestamp}")))
}

fn validate_table_name(table: &str) -> Result<(), String> {
    if table.is_empty() {
        return Err("table name is empty".to_string());
    }
    let parts: Vec<&str> = table.split('.').collect();
    if parts.len() > 2 {
        return Err(format!("invalid table name: {table}"));
    }
    for part in parts {
        let mut chars = part.chars();
        let first = match chars.next() {
            Some(ch) => ch,
            None => return Err(format!("invalid table name: {table}")),
        };
        if !(first.is_ascii_alphabetic() || first == '_') {
            return Err(format!("invalid table name: {table}"));
        }
        if !chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_') {
            return Err(format!("invalid table name: {table}"));
        }
    }
    Ok(())
}
