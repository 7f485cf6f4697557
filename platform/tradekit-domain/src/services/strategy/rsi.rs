use super::params::{f64_param, reject_unknown, usize_param, ParamValue, StrategyParams};
use super::Strategy;
use crate::value_objects::bar::Bar;
use crate::value_objects::signal::{Signal, SignalMetadata, SignalType};
use ta::indicators::RelativeStrengthIndex;
use ta::Next;
use tracing::warn;

pub const KIND: &str = "rsi";

/// Buys when RSI drops into the oversold zone and sells when it rises into the overbought zone.
#[derive(Debug, Clone, PartialEq)]
pub struct RsiStrategy {
    period: usize,
    overbought: f64,
    oversold: f64,
}

impl Default for RsiStrategy {
    fn default() -> Self {
        Self {
            period: 14,
            overbought: 70.0,
            oversold: 30.0,
        }
    }
}

impl RsiStrategy {
    pub fn new(period: usize, overbought: f64, oversold: f64) -> Self {
        Self {
            period,
            overbought,
            oversold,
        }
    }

    pub fn from_params(params: &StrategyParams) -> Result<Self, String> {
        let mut strategy = Self::default();
        strategy.apply(params)?;
        strategy.validate_parameters()?;
        Ok(strategy)
    }

    fn apply(&mut self, params: &StrategyParams) -> Result<(), String> {
        reject_unknown(params, &["period", "overbought", "oversold"])?;
        if let Some(value) = usize_param(params, "period")? {
            self.period = value;
        }
        if let Some(value) = f64_param(params, "overbought")? {
            self.overbought = value;
        }
        if let Some(value) = f64_param(params, "oversold")? {
            self.oversold = value;
        }
        Ok(())
    }
}

impl Strategy for RsiStrategy {
    fn name(&self) -> &str {
        KIND
    }

    fn params(&self) -> StrategyParams {
        StrategyParams::from([
            ("overbought".to_string(), ParamValue::Float(self.overbought)),
            ("oversold".to_string(), ParamValue::Float(self.oversold)),
            ("period".to_string(), ParamValue::Int(self.period as i64)),
        ])
    }

    fn validate_parameters(&self) -> Result<(), String> {
        if self.period == 0 {
            return Err("period must be positive".to_string());
        }
        let ordered =
            0.0 < self.oversold && self.oversold < self.overbought && self.overbought < 100.0;
        if !ordered {
            return Err(format!(
                "thresholds must satisfy 0 < oversold ({}) < overbought ({}) < 100",
                self.oversold, self.overbought
            ));
        }
        Ok(())
    }

    fn update_parameters(&mut self, params: StrategyParams) -> bool {
        let mut candidate = self.clone();
        match candidate.apply(&params).and_then(|_| candidate.validate_parameters()) {
            Ok(()) => {
                *self = candidate;
                true
            }
            Err(err) => {
                warn!(strategy = KIND, error = %err, "parameter update rejected");
                false
            }
        }
    }

    fn generate_signals(&self, bars: &[Bar]) -> Vec<Signal> {
        let mut indicator = match RelativeStrengthIndex::new(self.period) {
            Ok(indicator) => indicator,
            Err(err) => {
                warn!(strategy = KIND, error = ?err, "invalid period, no signals generated");
                return Vec::new();
            }
        };

        let mut signals = Vec::new();
        let mut previous: Option<f64> = None;
        for (idx, bar) in bars.iter().enumerate() {
            let rsi = indicator.next(bar.close);
            if idx + 1 < self.period {
                continue;
            }

            if let Some(prev) = previous {
                let signal_type = if prev >= self.oversold && rsi < self.oversold {
                    Some(SignalType::Buy)
                } else if prev <= self.overbought && rsi > self.overbought {
                    Some(SignalType::Sell)
                } else {
                    None
                };
                if let Some(signal_type) = signal_type {
                    signals.push(
                        Signal::new(&bar.symbol, signal_type, bar.timestamp, bar.close)
                            .with_volume(bar.volume)
                            .with_metadata(SignalMetadata {
                                rsi: Some(rsi),
                                ..SignalMetadata::default()
                            }),
                    );
                }
            }
            previous = Some(rsi);
        }
        signals
    }
}
