//! Blocking REST clients for public market data.

pub mod binance;
pub mod okx;

use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};
use tradekit_domain::repositories::exchange::ExchangeProvider;

pub use binance::BinanceProvider;
pub use okx::OkxProvider;

#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub timeout_secs: u64,
    pub binance_base_url: Option<String>,
    pub okx_base_url: Option<String>,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            binance_base_url: None,
            okx_base_url: None,
        }
    }
}

pub const SUPPORTED_EXCHANGES: [&str; 2] = ["binance", "okx"];

pub fn build_provider(
    name: &str,
    settings: &ProviderSettings,
) -> Result<Box<dyn ExchangeProvider>, String> {
    match name.trim().to_lowercase().as_str() {
        "binance" => Ok(Box::new(BinanceProvider::new(
            settings.binance_base_url.as_deref(),
            settings.timeout_secs,
        )?)),
        "okx" => Ok(Box::new(OkxProvider::new(
            settings.okx_base_url.as_deref(),
            settings.timeout_secs,
        )?)),
        other => Err(format!(
            "unsupported exchange '{}' (supported: {})",
            other,
            SUPPORTED_EXCHANGES.join(", ")
        )),
    }
}

pub(crate) fn http_client(timeout_secs: u64) -> Result<Client, String> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs.max(1)))
        .pool_idle_timeout(Duration::from_secs(90))
        .build()
        .map_err(|err| format!("failed to build http client: {err}"))
}

/// GETs `url` and decodes the JSON body; any non-200 status is an error carrying the body.
pub(crate) fn get_json<T: DeserializeOwned>(
    client: &Client,
    exchange: &'static str,
    endpoint: &'static str,
    url: &str,
    query: &[(&str, String)],
) -> Result<T, String> {
    let start = Instant::now();
    let response = client.get(url).query(query).send().map_err(|err| {
        metrics::counter!(
            "tradekit.infra.exchange.errors_total",
            "exchange" => exchange,
            "endpoint" => endpoint,
            "kind" => "transport"
        )
        .increment(1);
        format!("{exchange} request to {endpoint} failed: {err}")
    })?;
    let status = response.status();
    metrics::histogram!(
        "tradekit.infra.exchange.request_ms",
        "exchange" => exchange,
        "endpoint" => endpoint,
        "status" => status.as_u16().to_string()
    )
    .record(start.elapsed().as_millis() as f64);

    if status != StatusCode::OK {
        let body = response.text().unwrap_or_default();
        metrics::counter!(
            "tradekit.infra.exchange.errors_total",
            "exchange" => exchange,
            "endpoint" => endpoint,
            "kind" => "http_status"
        )
        .increment(1);
        return Err(format!(
            "{exchange} {endpoint} http error: status {} body {}",
            status.as_u16(),
            body.chars().take(200).collect::<String>()
        ));
    }
    response
        .json::<T>()
        .map_err(|err| format!("failed to decode {exchange} {endpoint} response: {err}"))
}

pub(crate) fn parse_decimal(value: &serde_json::Value, field: &str) -> Result<f64, String> {
    let parsed = match value {
        serde_json::Value::String(text) => text.parse::<f64>().ok(),
        serde_json::Value::Number(number) => number.as_f64(),
        _ => None,
    };
    parsed
        .filter(|v| v.is_finite())
        .ok_or_else(|| format!("invalid {field}: {value}"))
}

pub(crate) fn parse_millis(value: &serde_json::Value, field: &str) -> Result<i64, String> {
    let parsed = match value {
        serde_json::Value::String(text) => text.parse::<i64>().ok(),
        serde_json::Value::Number(number) => number.as_i64(),
        _ => None,
    };
    parsed
        .map(|ms| ms.div_euclid(1_000))
        .ok_or_else(|| format!("invalid {field}: {value}"))
}


#[cfg(test)]
mod tests {
    use super::{build_provider, parse_decimal, parse_millis, ProviderSettings};
    use serde_json::json;

    #[test]
    fn build_provider_knows_binance_and_okx() {
        let settings = ProviderSettings::default();
        assert_eq!(build_provider("binance", &settings).expect("binance").name(), "binance");
        assert_eq!(build_provider("OKX", &settings).expect("okx").name(), "okx");
        let err = build_provider("kraken", &settings)
            .err()
            .expect("unknown exchange");
        assert!(err.contains("kraken"));
        assert!(err.contains("binance, okx"));
    }

    #[test]
    fn decimals_and_millis_accept_strings_and_numbers() {
        assert_eq!(parse_decimal(&json!("42.5"), "close").expect("str"), 42.5);
        assert_eq!(parse_decimal(&json!(7), "close").expect("num"), 7.0);
        assert!(parse_decimal(&json!("abc"), "close").is_err());
        assert_eq!(parse_millis(&json!(1_700_000_000_123i64), "ts").expect("num"), 1_700_000_000);
        assert_eq!(parse_millis(&json!("1700000000000"), "ts").expect("str"), 1_700_000_000);
        assert!(parse_millis(&json!(null), "ts").is_err());
    }
}
