use super::DownloadArgs;
use tradekit_application::config::Config;
use tradekit_application::download::{
    download_market_data, start_for_days, DownloadRequest, DownloadSettings,
};
use tradekit_domain::value_objects::time::{format_timestamp, now_timestamp, parse_date_or_rfc3339};
use tradekit_domain::value_objects::timeframe::Timeframe;

pub(super) fn run_download(args: DownloadArgs, config: &Config) -> Result<(), String> {
    super::common::print_config_summary("download", config);

    let exchange = args.exchange.unwrap_or_else(|| config.run.exchange.clone());
    let symbols = if args.symbols.is_empty() {
        vec![config.run.symbol.clone()]
    } else {
        args.symbols
    };
    let timeframes = if args.timeframes.is_empty() {
        vec![config.run.timeframe.clone()]
    } else {
        args.timeframes
    };
    let end = match args.end.as_deref() {
        Some(raw) => parse_date_or_rfc3339(raw)?,
        None => now_timestamp(),
    };
    let start = match (args.start.as_deref(), args.days.or(config.run.days)) {
        (Some(raw), _) => parse_date_or_rfc3339(raw)?,
        (None, Some(days)) => start_for_days(end, days),
        (None, None) => return Err("download needs --start or --days (or run.days)".to_string()),
    };

    let provider = crate::infra::build_provider(config, &exchange)?;
    let storage = if args.no_store {
        None
    } else {
        Some(crate::infra::build_storage(config)?)
    };
    let settings = DownloadSettings {
        rate_limit_ms: config.exchange.rate_limit_ms,
        max_retries: config.exchange.max_retries,
        retry_delay_ms: config.exchange.retry_delay_ms,
        page_limit: None,
    };

    let mut failures = Vec::new();
    for symbol in &symbols {
        for raw_timeframe in &timeframes {
            let timeframe = Timeframe::parse(raw_timeframe)?;
            println!(
                "downloading {} {} from {} ({} .. {})",
                symbol,
                timeframe,
                provider.name(),
                format_timestamp(start),
                format_timestamp(end)
            );
            let request = DownloadRequest {
                symbol: symbol.clone(),
                timeframe,
                start,
                end,
                no_store: args.no_store,
                data_name: None,
            };
            match download_market_data(&request, &settings, provider.as_ref(), storage.as_deref()) {
                Ok(outcome) => {
                    match &outcome.summary {
                        Some(summary) => println!(
                            "  {} rows, {} .. {}, last close {}, high {}, low {}",
                            summary.rows,
                            format_timestamp(summary.first_timestamp),
                            format_timestamp(summary.last_timestamp),
                            summary.last_close,
                            summary.highest_close,
                            summary.lowest_close
                        ),
                        None => println!("  no data in range"),
                    }
                    if outcome.stored {
                        println!("  stored as {}", outcome.dataset);
                    }
                    super::common::print_quality(&outcome.quality);
                }
                Err(err) => {
                    tracing::error!(
                        symbol = %symbol,
                        timeframe = %raw_timeframe,
                        error = %err,
                        "download failed"
                    );
                    println!("  failed: {err}");
                    failures.push(format!("{symbol} {raw_timeframe}"));
                }
            }
        }
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(format!("download failed for: {}", failures.join(", ")))
    }
}
