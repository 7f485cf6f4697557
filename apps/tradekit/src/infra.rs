use tradekit_application::config::{Config, StorageKind};
use tradekit_domain::repositories::artifacts::{ArtifactReader, ArtifactWriter};
use tradekit_domain::repositories::exchange::ExchangeProvider;
use tradekit_domain::repositories::storage::DataStorage;
use tradekit_infrastructure::artifacts::{FilesystemArtifactReader, FilesystemArtifactWriter};
use tradekit_infrastructure::exchanges::{self, ProviderSettings};
use tradekit_infrastructure::storage::{CsvStorage, JsonDocumentStorage, PostgresStorage};

const DEFAULT_POOL_MAX_SIZE: u32 = 4;

pub struct ReportingDeps {
    pub reader: Box<dyn ArtifactReader>,
    pub writer: Box<dyn ArtifactWriter>,
}

pub fn build_reporting_deps() -> ReportingDeps {
    ReportingDeps {
        reader: Box::new(FilesystemArtifactReader::new()),
        writer: Box::new(FilesystemArtifactWriter::new()),
    }
}

pub fn build_storage(config: &Config) -> Result<Box<dyn DataStorage>, String> {
    let storage = &config.storage;
    match storage.kind {
        StorageKind::Csv => Ok(Box::new(CsvStorage::new(&storage.path))),
        StorageKind::Json => Ok(Box::new(JsonDocumentStorage::new(&storage.path))),
        StorageKind::Postgres => {
            let db_url = config.resolve_db_url().ok_or_else(|| {
                format!(
                    "missing storage.db_url in config and env {} is not set",
                    tradekit_application::config::DB_URL_ENV
                )
            })?;
            let pool_max_size = storage.pool_max_size.unwrap_or(DEFAULT_POOL_MAX_SIZE);
            let store = PostgresStorage::new(&db_url, pool_max_size)
                .map_err(|err| format!("failed to open postgres storage: {err}"))?;
            Ok(Box::new(store))
        }
    }
}

pub fn build_provider(
    config: &Config,
    exchange: &str,
) -> Result<Box<dyn ExchangeProvider>, String> {
    exchanges::build_provider(
        exchange,
        &ProviderSettings {
            timeout_secs: config.exchange.timeout_secs,
            binance_base_url: config.exchange.binance_base_url.clone(),
            okx_base_url: config.exchange.okx_base_url.clone(),
        },
    )
}
