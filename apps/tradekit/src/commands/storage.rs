use super::StorageAction;
use tradekit_application::config::Config;
use tradekit_application::storage_admin::{dataset_info, delete_dataset, list_datasets};
use tradekit_domain::value_objects::time::format_timestamp;

fn fmt_ts(ts: Option<i64>) -> String {
    ts.map(format_timestamp).unwrap_or_else(|| "-".to_string())
}

pub(super) fn run_storage(action: StorageAction, config: &Config) -> Result<(), String> {
    let storage = crate::infra::build_storage(config)?;
    match action {
        StorageAction::List => {
            let listings = list_datasets(storage.as_ref())?;
            if listings.is_empty() {
                println!("no datasets in {} storage", storage.backend());
            }
            for listing in listings {
                match listing.metadata {
                    Some(meta) => println!(
                        "{}  {} {} {}  rows={}  {} .. {}",
                        listing.name,
                        meta.exchange,
                        meta.symbol,
                        meta.timeframe,
                        meta.rows,
                        fmt_ts(meta.start_time),
                        fmt_ts(meta.end_time)
                    ),
                    None => println!("{}  (no metadata)", listing.name),
                }
            }
        }
        StorageAction::Info { name } => {
            let info = dataset_info(storage.as_ref(), &name)?;
            println!("dataset: {}", info.name);
            println!("rows: {}", info.rows);
            println!(
                "range: {} .. {}",
                fmt_ts(info.first_timestamp),
                fmt_ts(info.last_timestamp)
            );
            if let Some(meta) = &info.metadata {
                println!(
                    "metadata: {}",
                    serde_json::to_string_pretty(meta)
                        .map_err(|err| format!("failed to render metadata: {err}"))?
                );
            }
            println!(
                "quality: duplicates={}, gaps={}, out_of_order={}, invalid_close={}, \
                 max_gap_seconds={}",
                info.quality.duplicates,
                info.quality.gaps,
                info.quality.out_of_order,
                info.quality.invalid_close,
                info.quality
                    .max_gap_seconds
                    .map(|gap| gap.to_string())
                    .unwrap_or_else(|| "-".to_string())
            );
        }
        StorageAction::Delete { name } => {
            if delete_dataset(storage.as_ref(), &name)? {
                println!("deleted {name}");
            } else {
                println!("nothing to delete for {name}");
            }
        }
    }
    Ok(())
}
