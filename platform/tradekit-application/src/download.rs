use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, info_span, warn};
use tradekit_domain::repositories::exchange::{ExchangeProvider, PageCursor};
use tradekit_domain::repositories::storage::{dataset_name, DataStorage, DatasetMetadata};
use tradekit_domain::services::ohlcv::{
    canonicalize_bars, data_quality_from_bars, filter_range, price_summary, DataQualityReport,
    PriceSummary,
};
use tradekit_domain::value_objects::bar::Bar;
use tradekit_domain::value_objects::time::now_timestamp;
use tradekit_domain::value_objects::timeframe::Timeframe;

#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub start: i64,
    pub end: i64,
    pub no_store: bool,
    pub data_name: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct DownloadSettings {
    pub rate_limit_ms: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    /// Page size; capped at what the exchange serves.
    pub page_limit: Option<usize>,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            rate_limit_ms: 200,
            max_retries: 3,
            retry_delay_ms: 1_000,
            page_limit: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DownloadOutcome {
    pub dataset: String,
    pub bars: Vec<Bar>,
    pub pages: usize,
    pub retries: u32,
    pub stored: bool,
    pub summary: Option<PriceSummary>,
    pub quality: DataQualityReport,
}

pub fn download_market_data(
    request: &DownloadRequest,
    settings: &DownloadSettings,
    provider: &dyn ExchangeProvider,
    storage: Option<&dyn DataStorage>,
) -> Result<DownloadOutcome, String> {
    let _span = info_span!(
        "download_market_data",
        exchange = provider.name(),
        symbol = %request.symbol,
        timeframe = %request.timeframe
    )
    .entered();

    if request.end < request.start {
        return Err(format!(
            "download range is empty: start {} is after end {}",
            request.start, request.end
        ));
    }

    let limit = settings
        .page_limit
        .unwrap_or(provider.max_limit())
        .clamp(1, provider.max_limit().max(1));
    let step = request.timeframe.step_seconds;

    let stage_start = Instant::now();
    let mut collected: Vec<Bar> = Vec::new();
    let mut pages = 0usize;
    let mut retries = 0u32;
    let mut since = request.start;
    let cursor = provider.page_cursor();
    let horizon = request.end.min(now_timestamp());
    loop {
        let (page, page_retries) = fetch_with_retry(provider, request, since, limit, settings)?;
        retries += page_retries;
        let last_ts = page.last().map(|bar| bar.timestamp);
        let page_len = page.len();
        if page_len > 0 {
            pages += 1;
            collected.extend(page);
            metrics::counter!("tradekit.download.pages").increment(1);
        }

        let next = match (cursor, last_ts) {
            (PageCursor::FromStart, None) => break,
            (PageCursor::FromStart, Some(last_ts)) => {
                if page_len < limit || last_ts >= request.end {
                    break;
                }
                if last_ts < since {
                    warn!(
                        since,
                        last_ts,
                        "exchange returned bars before the requested start, stopping"
                    );
                    break;
                }
                last_ts + step
            }
            (PageCursor::FixedWindow, last_ts) => {
                if page_len < limit {
                    debug!(since, rows = page_len, "short window page");
                }
                let window_end = since + limit as i64 * step;
                last_ts.map_or(window_end, |ts| window_end.max(ts + step))
            }
        };
        if next > horizon {
            break;
        }
        since = next;
        if settings.rate_limit_ms > 0 {
            thread::sleep(Duration::from_millis(settings.rate_limit_ms));
        }
    }
    metrics::histogram!("tradekit.download.fetch_ms")
        .record(stage_start.elapsed().as_millis() as f64);

    let bars = filter_range(canonicalize_bars(collected), Some(request.start), Some(request.end));
    let quality = data_quality_from_bars(&bars, Some(step));
    let summary = price_summary(&bars);
    metrics::counter!("tradekit.download.rows").increment(bars.len() as u64);

    let dataset = request.data_name.clone().unwrap_or_else(|| {
        dataset_name(provider.name(), &request.symbol, request.timeframe.as_str())
    });

    let mut stored = false;
    if bars.is_empty() {
        warn!(dataset = %dataset, "no bars in the requested range, nothing stored");
    } else if !request.no_store {
        let storage = storage.ok_or_else(|| "no storage configured for download".to_string())?;
        let metadata = DatasetMetadata::describe(
            &bars,
            &request.symbol,
            provider.name(),
            request.timeframe.as_str(),
            &format!("exchange:{}", provider.name()),
        );
        storage
            .save_data(&bars, &dataset, Some(&metadata))
            .map_err(|err| format!("failed to store {dataset}: {err}"))?;
        stored = true;
    }

    info!(
        dataset = %dataset,
        rows = bars.len(),
        pages,
        retries,
        gaps = quality.gaps,
        stored,
        "download complete"
    );

    Ok(DownloadOutcome {
        dataset,
        bars,
        pages,
        retries,
        stored,
        summary,
        quality,
    })
}

fn fetch_with_retry(
    provider: &dyn ExchangeProvider,
    request: &DownloadRequest,
    since: i64,
    limit: usize,
    settings: &DownloadSettings,
) -> Result<(Vec<Bar>, u32), String> {
    let mut attempt = 0u32;
    loop {
        match provider.fetch_ohlcv(&request.symbol, &request.timeframe, since, limit) {
            Ok(page) => return Ok((page, attempt)),
            Err(err) if attempt < settings.max_retries => {
                attempt += 1;
                metrics::counter!("tradekit.download.retries").increment(1);
                warn!(attempt, since, error = %err, "page fetch failed, retrying");
                if settings.retry_delay_ms > 0 {
                    thread::sleep(Duration::from_millis(settings.retry_delay_ms));
                }
            }
            Err(err) => {
                return Err(format!(
                    "{} fetch_ohlcv {} {} failed after {} attempts: {}",
                    provider.name(),
                    request.symbol,
                    request.timeframe,
                    attempt + 1,
                    err
                ));
            }
        }
    }
}

/// Start of a trailing window of `days` ending at `end`.
pub fn start_for_days(end: i64, days: u32) -> i64 {
    end - i64::from(days) * 86_400
}
