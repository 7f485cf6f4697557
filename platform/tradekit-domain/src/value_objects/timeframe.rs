use serde::{Deserialize, Serialize};
use std::fmt;

/// Bar interval: the canonical label (`1m`, `1h`, `1d`, ...) and its length in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Timeframe {
    pub label: String,
    pub step_seconds: i64,
}

impl Timeframe {
    pub fn parse(value: &str) -> Result<Self, String> {
        let normalized = value.trim().to_lowercase();
        let label = match normalized.as_str() {
            "1m" | "1min" => "1m",
            "3m" | "3min" => "3m",
            "5m" | "5min" => "5m",
            "15m" | "15min" => "15m",
            "30m" | "30min" => "30m",
            "1h" | "1hour" => "1h",
            "2h" | "2hour" => "2h",
            "4h" | "4hour" => "4h",
            "6h" | "6hour" => "6h",
            "8h" | "8hour" => "8h",
            "12h" | "12hour" => "12h",
            "1d" | "1day" => "1d",
            "3d" | "3day" => "3d",
            "1w" | "1week" => "1w",
            "1mo" | "1month" => "1mo",
            _ => return Err(format!("unsupported timeframe: {value}")),
        };

        let step_seconds = parse_duration_like_seconds(label)?;
        Ok(Self {
            label: label.to_string(),
            step_seconds,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.label
    }

    /// Interval code for Binance `klines`.
    pub fn binance_interval(&self) -> &'static str {
        match self.label.as_str() {
            "1m" => "1m",
            "3m" => "3m",
            "5m" => "5m",
            "15m" => "15m",
            "30m" => "30m",
            "1h" => "1h",
            "2h" => "2h",
            "4h" => "4h",
            "6h" => "6h",
            "8h" => "8h",
            "12h" => "12h",
            "1d" => "1d",
            "3d" => "3d",
            "1w" => "1w",
            _ => "1M",
        }
    }

    /// Bar code for OKX candles, UTC-aligned for daily and longer bars.
    /// OKX has no 8h bar.
    pub fn okx_bar(&self) -> Result<&'static str, String> {
        let bar = match self.label.as_str() {
            "1m" => "1m",
            "3m" => "3m",
            "5m" => "5m",
            "15m" => "15m",
            "30m" => "30m",
            "1h" => "1H",
            "2h" => "2H",
            "4h" => "4H",
            "6h" => "6Hutc",
            "12h" => "12Hutc",
            "1d" => "1Dutc",
            "3d" => "3Dutc",
            "1w" => "1Wutc",
            "1mo" => "1Mutc",
            other => return Err(format!("okx does not support timeframe {other}")),
        };
        Ok(bar)
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

impl TryFrom<String> for Timeframe {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Timeframe> for String {
    fn from(value: Timeframe) -> Self {
        value.label
    }
}

pub fn parse_duration_like_seconds(value: &str) -> Result<i64, String> {
    let trimmed = value.trim().to_lowercase();
    if trimmed.is_empty() {
        return Err("empty duration".to_string());
    }
    if let Ok(seconds) = trimmed.parse::<i64>() {
        return Ok(seconds);
    }

    let (number_part, unit) = ["min", "hour", "day", "week", "month", "mo"]
        .iter()
        .find_map(|suffix| trimmed.strip_suffix(suffix).map(|rest| (rest, *suffix)))
        .unwrap_or_else(|| trimmed.split_at(trimmed.len().saturating_sub(1)));

    let multiplier = match unit {
        "s" => 1,
        "m" | "min" => 60,
        "h" | "hour" => 3600,
        "d" | "day" => 86400,
        "w" | "week" => 604800,
        "mo" | "month" => 2592000,
        _ => return Err(format!("unsupported duration unit: {unit}")),
    };

    let number: i64 = number_part
        .parse()
        .map_err(|_| format!("invalid duration: {value}"))?;
    Ok(number * multiplier)
}

#[cfg(test)]
mod tests {
    use super::{parse_duration_like_seconds, Timeframe};

    #[test]
    fn parses_aliases_to_canonical_labels() {
        let tf = Timeframe::parse("1hour").unwrap();
        assert_eq!(tf.label, "1h");
        assert_eq!(tf.step_seconds, 3600);
        assert_eq!(Timeframe::parse("15M").unwrap().step_seconds, 900);
        assert_eq!(Timeframe::parse("1mo").unwrap().step_seconds, 2_592_000);
        assert!(Timeframe::parse("7m").is_err());
    }

    #[test]
    fn maps_exchange_codes() {
        let tf = Timeframe::parse("4h").unwrap();
        assert_eq!(tf.binance_interval(), "4h");
        assert_eq!(tf.okx_bar().unwrap(), "4H");
        assert_eq!(Timeframe::parse("1d").unwrap().okx_bar().unwrap(), "1Dutc");
        assert!(Timeframe::parse("8h").unwrap().okx_bar().is_err());
    }

    #[test]
    fn duration_units() {
        assert_eq!(parse_duration_like_seconds("90").unwrap(), 90);
        assert_eq!(parse_duration_like_seconds("2d").unwrap(), 172_800);
        assert_eq!(parse_duration_like_seconds("3min").unwrap(), 180);
        assert!(parse_duration_like_seconds("5x").is_err());
    }
}
