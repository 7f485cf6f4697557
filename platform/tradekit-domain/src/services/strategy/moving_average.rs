use super::params::{reject_unknown, usize_param, ParamValue, StrategyParams};
use super::Strategy;
use crate::value_objects::bar::Bar;
use crate::value_objects::signal::{Signal, SignalMetadata, SignalType};
use ta::indicators::SimpleMovingAverage;
use ta::Next;
use tracing::warn;

pub const KIND: &str = "moving_average";

/// Short/long simple moving average crossover.
#[derive(Debug, Clone, PartialEq)]
pub struct MovingAverageCross {
    short_window: usize,
    long_window: usize,
}

impl Default for MovingAverageCross {
    fn default() -> Self {
        Self {
            short_window: 5,
            long_window: 20,
        }
    }
}

impl MovingAverageCross {
    pub fn new(short_window: usize, long_window: usize) -> Self {
        Self {
            short_window,
            long_window,
        }
    }

    pub fn from_params(params: &StrategyParams) -> Result<Self, String> {
        let mut strategy = Self::default();
        strategy.apply(params)?;
        strategy.validate_parameters()?;
        Ok(strategy)
    }

    fn apply(&mut self, params: &StrategyParams) -> Result<(), String> {
        reject_unknown(params, &["short_window", "long_window"])?;
        if let Some(value) = usize_param(params, "short_window")? {
            self.short_window = value;
        }
        if let Some(value) = usize_param(params, "long_window")? {
            self.long_window = value;
        }
        Ok(())
    }
}

impl Strategy for MovingAverageCross {
    fn name(&self) -> &str {
        KIND
    }

    fn params(&self) -> StrategyParams {
        StrategyParams::from([
            (
                "long_window".to_string(),
                ParamValue::Int(self.long_window as i64),
            ),
            (
                "short_window".to_string(),
                ParamValue::Int(self.short_window as i64),
            ),
        ])
    }

    fn validate_parameters(&self) -> Result<(), String> {
        if self.short_window == 0 || self.long_window == 0 {
            return Err("moving average windows must be positive".to_string());
        }
        if self.short_window >= self.long_window {
            return Err(format!(
                "short_window ({}) must be less than long_window ({})",
                self.short_window, self.long_window
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
        let (mut short_sma, mut long_sma) = match (
            SimpleMovingAverage::new(self.short_window),
            SimpleMovingAverage::new(self.long_window),
        ) {
            (Ok(short), Ok(long)) => (short, long),
            _ => {
                warn!(strategy = KIND, "invalid windows, no signals generated");
                return Vec::new();
            }
        };

        let mut signals = Vec::new();
        let mut previous: Option<(f64, f64)> = None;
        for (idx, bar) in bars.iter().enumerate() {
            let short = short_sma.next(bar.close);
            let long = long_sma.next(bar.close);
            if idx + 1 < self.long_window {
                continue;
            }

            if let Some((prev_short, prev_long)) = previous {
                let signal_type = if prev_short <= prev_long && short > long {
                    Some(SignalType::Buy)
                } else if prev_short >= prev_long && short < long {
                    Some(SignalType::Sell)
                } else {
                    None
                };
                if let Some(signal_type) = signal_type {
                    signals.push(
                        Signal::new(&bar.symbol, signal_type, bar.timestamp, bar.close)
                            .with_volume(bar.volume)
                            .with_metadata(SignalMetadata {
                                short_ma: Some(short),
                                long_ma: Some(long),
                                ..SignalMetadata::default()
                            }),
                    );
                }
            }
            previous = Some((short, long));
        }
        signals
    }
}

#[cfg(test)]
mod tests {
    use super::MovingAverageCross;
    use crate::services::strategy::params::{parse_strategy_params, ParamValue};
    use crate::services::strategy::Strategy;
    use crate::value_objects::bar::Bar;
    use crate::value_objects::signal::SignalType;

    fn bars(closes: &[f64]) -> Vec<Bar> {
        closes
            .iter()
            .enumerate()
            .map(|(idx, close)| Bar::flat("BTC/USDT", idx as i64 * 60, *close))
            .collect()
    }

    #[test]
    fn emits_buy_then_sell_on_crossovers() {
        let strategy = MovingAverageCross::new(2, 3);
        let closes = [10.0, 10.0, 10.0, 12.0, 14.0, 16.0, 12.0, 8.0, 6.0];
        let signals = strategy.generate_signals(&bars(&closes));
        let kinds: Vec<SignalType> = signals.iter().map(|s| s.signal_type).collect();
        assert_eq!(kinds, vec![SignalType::Buy, SignalType::Sell]);
        assert_eq!(signals[0].timestamp, 3 * 60);
        assert!(signals[0].metadata.short_ma.unwrap() > signals[0].metadata.long_ma.unwrap());
    }

    #[test]
    fn no_signals_before_long_window_is_warm() {
        let strategy = MovingAverageCross::new(2, 5);
        assert!(strategy.generate_signals(&bars(&[1.0, 2.0, 3.0, 4.0])).is_empty());
        assert!(strategy.generate_signals(&[]).is_empty());
    }

    #[test]
    fn validates_window_order() {
        assert!(MovingAverageCross::new(20, 5).validate_parameters().is_err());
        assert!(MovingAverageCross::new(0, 5).validate_parameters().is_err());
        let params = parse_strategy_params("short_window=3,long_window=9");
        assert!(MovingAverageCross::from_params(&params).is_ok());
        assert!(MovingAverageCross::from_params(&parse_strategy_params("window=3")).is_err());
    }

    #[test]
    fn rejected_update_keeps_previous_params() {
        let mut strategy = MovingAverageCross::default();
        assert!(!strategy.update_parameters(parse_strategy_params("short_window=50")));
        assert_eq!(strategy.params()["short_window"], ParamValue::Int(5));
        assert!(strategy.update_parameters(parse_strategy_params("long_window=30")));
        assert_eq!(strategy.params()["long_window"], ParamValue::Int(30));
    }
}
