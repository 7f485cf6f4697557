use super::{get_json, http_client, parse_decimal, parse_millis};
use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::{debug, info_span};
use tradekit_domain::repositories::exchange::{ExchangeProvider, PageCursor};
use tradekit_domain::value_objects::bar::Bar;
use tradekit_domain::value_objects::ticker::Ticker;
use tradekit_domain::value_objects::timeframe::Timeframe;

pub const DEFAULT_BASE_URL: &str = "https://www.okx.com";
pub const MAX_LIMIT: usize = 100;

pub struct OkxProvider {
    base_url: String,
    client: Client,
}

/// OKX wraps every payload as `{code, msg, data}`; `code` is `"0"` on success.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    code: String,
    #[serde(default)]
    msg: String,
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

impl<T> Envelope<T> {
    fn into_data(self, endpoint: &str) -> Result<Vec<T>, String> {
        if self.code != "0" {
            return Err(format!("okx {endpoint} error {}: {}", self.code, self.msg));
        }
        Ok(self.data)
    }
}

#[derive(Debug, Deserialize)]
struct TickerRow {
    last: String,
    ts: String,
}

impl OkxProvider {
    pub fn new(base_url: Option<&str>, timeout_secs: u64) -> Result<Self, String> {
        Ok(Self {
            base_url: base_url
                .unwrap_or(DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            client: http_client(timeout_secs)?,
        })
    }
}

/// `BTC/USDT` -> `BTC-USDT`.
pub fn instrument_id(symbol: &str) -> String {
    symbol.replace('/', "-").to_uppercase()
}

/// Decodes history-candles rows (newest first) into ascending bars at or after `since`.
pub fn parse_candles(
    rows: &[Vec<serde_json::Value>],
    symbol: &str,
    since: i64,
) -> Result<Vec<Bar>, String> {
    let mut bars = rows
        .iter()
        .map(|row| {
            if row.len() < 6 {
                return Err(format!("candle row has {} fields, expected at least 6", row.len()));
            }
            Ok(Bar {
                symbol: symbol.to_string(),
                timestamp: parse_millis(&row[0], "ts")?,
                open: parse_decimal(&row[1], "open")?,
                high: parse_decimal(&row[2], "high")?,
                low: parse_decimal(&row[3], "low")?,
                close: parse_decimal(&row[4], "close")?,
                volume: parse_decimal(&row[5], "volume")?,
            })
        })
        .collect::<Result<Vec<Bar>, String>>()?;
    bars.retain(|bar| bar.timestamp >= since);
    bars.sort_by_key(|bar| bar.timestamp);
    Ok(bars)
}

/// `after` cursor that makes the newest-first endpoint return the `limit` bars from `since`.
pub fn after_cursor_ms(since: i64, limit: usize, step_seconds: i64) -> i64 {
    (since + limit as i64 * step_seconds) * 1_000
}

impl ExchangeProvider for OkxProvider {
    fn name(&self) -> &str {
        "okx"
    }

    fn max_limit(&self) -> usize {
        MAX_LIMIT
    }

    fn page_cursor(&self) -> PageCursor {
        PageCursor::FixedWindow
    }

    fn fetch_ohlcv(
        &self,
        symbol: &str,
        timeframe: &Timeframe,
        since: i64,
        limit: usize,
    ) -> Result<Vec<Bar>, String> {
        let _span = info_span!("infra.okx.candles", symbol, timeframe = %timeframe, since, limit)
            .entered();
        let limit = limit.clamp(1, MAX_LIMIT);
        let url = format!("{}/api/v5/market/history-candles", self.base_url);
        let query = [
            ("instId", instrument_id(symbol)),
            ("bar", timeframe.okx_bar()?.to_string()),
            (
                "after",
                after_cursor_ms(since, limit, timeframe.step_seconds).to_string(),
            ),
            ("limit", limit.to_string()),
        ];
        let envelope: Envelope<Vec<serde_json::Value>> =
            get_json(&self.client, "okx", "history_candles", &url, &query)?;
        let rows = envelope.into_data("history-candles")?;
        let bars = parse_candles(&rows, symbol, since)?;
        debug!(rows = bars.len(), "fetched candles");
        Ok(bars)
    }

    fn latest_price(&self, symbol: &str) -> Result<Ticker, String> {
        let url = format!("{}/api/v5/market/ticker", self.base_url);
        let envelope: Envelope<TickerRow> = get_json(
            &self.client,
            "okx",
            "ticker",
            &url,
            &[("instId", instrument_id(symbol))],
        )?;
        let row = envelope
            .into_data("ticker")?
            .into_iter()
            .next()
            .ok_or_else(|| format!("okx ticker returned no data for {symbol}"))?;
        Ok(Ticker {
            symbol: symbol.to_string(),
            timestamp: parse_millis(&serde_json::Value::String(row.ts), "ts")?,
            price: row
                .last
                .parse::<f64>()
                .map_err(|err| format!("invalid okx price '{}': {err}", row.last))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{after_cursor_ms, instrument_id, parse_candles, Envelope, OkxProvider};
    use crate::exchanges::test_support::MockServer;
    use tradekit_domain::repositories::exchange::{ExchangeProvider, PageCursor};

    const CANDLES: &str = r#"{"code":"0","msg":"","data":[
        ["1700007200000","37180","37300","37100","37250","3.1","115000","115000","1"],
        ["1700003600000","37050.25","37200","37000","37180","8.25","306000","306000","1"],
        ["1700000000000","37000.1","37100","36950.5","37050.25","12.5","463128","463128","1"],
        ["1699996400000","36900","37010","36880","37000.1","9","333000","333000","1"]
    ]}"#;

    #[test]
    fn instrument_ids_use_dashes() {
        assert_eq!(instrument_id("BTC/USDT"), "BTC-USDT");
        assert_eq!(instrument_id("eth/usdt"), "ETH-USDT");
    }

    #[test]
    fn candles_are_reversed_and_trimmed_to_since() {
        let envelope: Envelope<Vec<serde_json::Value>> =
            serde_json::from_str(CANDLES).expect("payload");
        let rows = envelope.into_data("history-candles").expect("data");
        let bars = parse_candles(&rows, "BTC/USDT", 1_700_000_000).expect("bars");

        let stamps: Vec<i64> = bars.iter().map(|bar| bar.timestamp).collect();
        assert_eq!(stamps, vec![1_700_000_000, 1_700_003_600, 1_700_007_200]);
        assert!((bars[0].open - 37_000.1).abs() < 1e-9);
    }

    #[test]
    fn error_envelopes_surface_code_and_message() {
        let body = r#"{"code":"51001","msg":"Instrument ID does not exist","data":[]}"#;
        let envelope: Envelope<Vec<serde_json::Value>> =
            serde_json::from_str(body).expect("payload");
        let err = envelope.into_data("history-candles").unwrap_err();
        assert!(err.contains("51001"));
        assert!(err.contains("Instrument ID does not exist"));
    }

    #[test]
    fn after_cursor_covers_one_page_forward() {
        assert_eq!(after_cursor_ms(1_700_000_000, 100, 3_600), 1_700_360_000_000);
    }

    #[test]
    fn latest_price_reads_ticker_envelope() {
        let server = MockServer::start(vec![
            r#"{"code":"0","msg":"","data":[
                {"instId":"BTC-USDT","last":"37251.5","ts":"1700007260000"}
            ]}"#
            .to_string(),
        ]);
        let provider = OkxProvider::new(Some(&server.base_url), 5).expect("provider");

        let ticker = provider.latest_price("BTC/USDT").expect("ticker");
        assert_eq!(ticker.timestamp, 1_700_007_260);
        assert!((ticker.price - 37_251.5).abs() < 1e-9);

        let lines = server.request_lines();
        assert!(lines[0].starts_with("GET /api/v5/market/ticker?instId=BTC-USDT"), "{}", lines[0]);
    }
}
