use crate::value_objects::time::format_timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalType {
    Buy,
    Sell,
    Hold,
}

impl SignalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalType::Buy => "BUY",
            SignalType::Sell => "SELL",
            SignalType::Hold => "HOLD",
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            SignalType::Buy => SignalType::Sell,
            SignalType::Sell => SignalType::Buy,
            SignalType::Hold => SignalType::Hold,
        }
    }
}

impl fmt::Display for SignalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    #[default]
    Strategy,
    ClosePosition,
}

/// Indicator snapshot a strategy attaches to the signal it emits.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SignalMetadata {
    pub kind: SignalKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_ma: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub long_ma: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rsi: Option<f64>,
}

impl SignalMetadata {
    pub fn close_position() -> Self {
        Self {
            kind: SignalKind::ClosePosition,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub symbol: String,
    pub signal_type: SignalType,
    pub timestamp: i64,
    pub price: f64,
    pub volume: Option<f64>,
    pub strength: f64,
    pub metadata: SignalMetadata,
}

impl Signal {
    pub fn new(symbol: &str, signal_type: SignalType, timestamp: i64, price: f64) -> Self {
        Self {
            symbol: symbol.to_string(),
            signal_type,
            timestamp,
            price,
            volume: None,
            strength: 1.0,
            metadata: SignalMetadata::default(),
        }
    }

    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = Some(volume);
        self
    }

    /// Strength is kept inside [0, 1]; NaN falls back to full strength.
    pub fn with_strength(mut self, strength: f64) -> Self {
        self.strength = if strength.is_nan() {
            1.0
        } else {
            strength.clamp(0.0, 1.0)
        };
        self
    }

    pub fn with_metadata(mut self, metadata: SignalMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn is_close_position(&self) -> bool {
        self.metadata.kind == SignalKind::ClosePosition
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Signal({}, {}, time: {}, price: {}, strength: {:.2})",
            self.symbol,
            self.signal_type,
            format_timestamp(self.timestamp),
            self.price,
            self.strength
        )
    }
}
