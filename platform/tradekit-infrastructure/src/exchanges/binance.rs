use super::{get_json, http_client, parse_decimal, parse_millis};
use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::{debug, info_span};
use tradekit_domain::repositories::exchange::ExchangeProvider;
use tradekit_domain::value_objects::bar::Bar;
use tradekit_domain::value_objects::ticker::Ticker;
use tradekit_domain::value_objects::time::now_timestamp;
use tradekit_domain::value_objects::timeframe::Timeframe;

pub const DEFAULT_BASE_URL: &str = "https://api.binance.com";
pub const MAX_LIMIT: usize = 1_000;

pub struct BinanceProvider {
    base_url: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct TickerPrice {
    price: String,
}

impl BinanceProvider {
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

/// `BTC/USDT` -> `BTCUSDT`.
pub fn market_symbol(symbol: &str) -> String {
    symbol.replace(['/', '-'], "").to_uppercase()
}

/// Decodes `/api/v3/klines` rows: `[open_time_ms, open, high, low, close, volume, ...]`.
pub fn parse_klines(rows: &[Vec<serde_json::Value>], symbol: &str) -> Result<Vec<Bar>, String> {
    rows.iter()
        .map(|row| {
            if row.len() < 6 {
                return Err(format!("kline row has {} fields, expected at least 6", row.len()));
            }
            Ok(Bar {
                symbol: symbol.to_string(),
                timestamp: parse_millis(&row[0], "open_time")?,
                open: parse_decimal(&row[1], "open")?,
                high: parse_decimal(&row[2], "high")?,
                low: parse_decimal(&row[3], "low")?,
                close: parse_decimal(&row[4], "close")?,
                volume: parse_decimal(&row[5], "volume")?,
            })
        })
        .collect()
}

impl ExchangeProvider for BinanceProvider {
    fn name(&self) -> &str {
        "binance"
    }

    fn max_limit(&self) -> usize {
        MAX_LIMIT
    }

    fn fetch_ohlcv(
        &self,
        symbol: &str,
        timeframe: &Timeframe,
        since: i64,
        limit: usize,
    ) -> Result<Vec<Bar>, String> {
        let _span = info_span!("infra.binance.klines", symbol, timeframe = %timeframe, since, limit)
            .entered();
        let url = format!("{}/api/v3/klines", self.base_url);
        let query = [
            ("symbol", market_symbol(symbol)),
            ("interval", timeframe.binance_interval().to_string()),
            ("startTime", (since * 1_000).to_string()),
            ("limit", limit.clamp(1, MAX_LIMIT).to_string()),
        ];
        let rows: Vec<Vec<serde_json::Value>> =
            get_json(&self.client, "binance", "klines", &url, &query)?;
        let bars = parse_klines(&rows, symbol)?;
        debug!(rows = bars.len(), "fetched klines");
        Ok(bars)
    }

    fn latest_price(&self, symbol: &str) -> Result<Ticker, String> {
        let url = format!("{}/api/v3/ticker/price", self.base_url);
        let ticker: TickerPrice = get_json(
            &self.client,
            "binance",
            "ticker_price",
            &url,
            &[("symbol", market_symbol(symbol))],
        )?;
        let price = ticker
            .price
            .parse::<f64>()
            .map_err(|err| format!("invalid binance price '{}': {err}", ticker.price))?;
        Ok(Ticker {
            symbol: symbol.to_string(),
            timestamp: now_timestamp(),
            price,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{market_symbol, parse_klines, BinanceProvider};
    use crate::exchanges::test_support::MockServer;
    use tradekit_domain::repositories::exchange::ExchangeProvider;
    use tradekit_domain::value_objects::timeframe::Timeframe;

    const KLINES: &str = r#"[
        [1700000000000, "37000.10", "37100.00", "36950.50", "37050.25", "12.5",
         1700003599999, "463128.1", 100, "6.1", "226000.0", "0"],
        [1700003600000, "37050.25", "37200.00", "37000.00", "37180.00", "8.25",
         1700007199999, "306000.0", 80, "4.0", "148000.0", "0"]
    ]"#;

    #[test]
    fn symbols_drop_separators() {
        assert_eq!(market_symbol("BTC/USDT"), "BTCUSDT");
        assert_eq!(market_symbol("eth-usdt"), "ETHUSDT");
    }

    #[test]
    fn klines_parse_into_bars() {
        let rows: Vec<Vec<serde_json::Value>> = serde_json::from_str(KLINES).expect("payload");
        let bars = parse_klines(&rows, "BTC/USDT").expect("bars");
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].timestamp, 1_700_000_000);
        assert_eq!(bars[0].symbol, "BTC/USDT");
        assert!((bars[0].close - 37_050.25).abs() < 1e-9);
        assert!((bars[1].volume - 8.25).abs() < 1e-9);
    }

    #[test]
    fn short_or_garbled_rows_are_rejected() {
        let short: Vec<Vec<serde_json::Value>> =
            serde_json::from_str(r#"[[1700000000000, "1", "2"]]"#).expect("payload");
        assert!(parse_klines(&short, "BTC/USDT").is_err());
        let garbled: Vec<Vec<serde_json::Value>> =
            serde_json::from_str(r#"[[1700000000000, "x", "2", "1", "1", "1"]]"#).expect("payload");
        assert!(parse_klines(&garbled, "BTC/USDT").unwrap_err().contains("open"));
    }

    #[test]
    fn fetch_ohlcv_queries_klines_endpoint() {
        let server = MockServer::start(vec![KLINES.to_string()]);
        let provider = BinanceProvider::new(Some(&server.base_url), 5).expect("provider");
        let timeframe = Timeframe::parse("1h").expect("timeframe");

        let bars = provider
            .fetch_ohlcv("BTC/USDT", &timeframe, 1_700_000_000, 2)
            .expect("fetch");
        assert_eq!(bars.len(), 2);

        let lines = server.request_lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("GET /api/v3/klines?"), "{}", lines[0]);
        assert!(lines[0].contains("symbol=BTCUSDT"));
        assert!(lines[0].contains("interval=1h"));
        assert!(lines[0].contains("startTime=1700000000000"));
        assert!(lines[0].contains("limit=2"));
    }
}
