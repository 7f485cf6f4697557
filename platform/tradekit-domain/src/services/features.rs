use crate::value_objects::bar::Bar;
use std::collections::VecDeque;
use ta::indicators::{
    AverageTrueRange, BollingerBands, CommodityChannelIndex, ExponentialMovingAverage,
    FastStochastic, Maximum, Minimum, MoneyFlowIndex, MovingAverageConvergenceDivergence,
    OnBalanceVolume, PercentagePriceOscillator, RateOfChange, RelativeStrengthIndex,
    SimpleMovingAverage,
};
use ta::Next;

/// Technical indicator families that can be added to a feature table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureKind {
    Sma,
    Ema,
    Macd,
    Rsi,
    Bollinger,
    Atr,
    Obv,
    Cci,
    Stochastic,
    WilliamsR,
    Momentum,
    RateOfChange,
    Ppo,
    Mfi,
}

impl FeatureKind {
    pub const ALL: [FeatureKind; 14] = [
        FeatureKind::Sma,
        FeatureKind::Ema,
        FeatureKind::Macd,
        FeatureKind::Rsi,
        FeatureKind::Bollinger,
        FeatureKind::Atr,
        FeatureKind::Obv,
        FeatureKind::Cci,
        FeatureKind::Stochastic,
        FeatureKind::WilliamsR,
        FeatureKind::Momentum,
        FeatureKind::RateOfChange,
        FeatureKind::Ppo,
        FeatureKind::Mfi,
    ];

    pub fn parse(value: &str) -> Result<Self, String> {
        let kind = match value.trim().to_lowercase().as_str() {
            "sma" => FeatureKind::Sma,
            "ema" => FeatureKind::Ema,
            "macd" => FeatureKind::Macd,
            "rsi" => FeatureKind::Rsi,
            "bollinger" | "bbands" => FeatureKind::Bollinger,
            "atr" => FeatureKind::Atr,
            "obv" => FeatureKind::Obv,
            "cci" => FeatureKind::Cci,
            "stoch" | "stochastic" => FeatureKind::Stochastic,
            "willr" => FeatureKind::WilliamsR,
            "mom" | "momentum" => FeatureKind::Momentum,
            "roc" => FeatureKind::RateOfChange,
            "ppo" => FeatureKind::Ppo,
            "mfi" => FeatureKind::Mfi,
            other => return Err(format!("unsupported indicator: {other}")),
        };
        Ok(kind)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureKind::Sma => "sma",
            FeatureKind::Ema => "ema",
            FeatureKind::Macd => "macd",
            FeatureKind::Rsi => "rsi",
            FeatureKind::Bollinger => "bollinger",
            FeatureKind::Atr => "atr",
            FeatureKind::Obv => "obv",
            FeatureKind::Cci => "cci",
            FeatureKind::Stochastic => "stoch",
            FeatureKind::WilliamsR => "willr",
            FeatureKind::Momentum => "mom",
            FeatureKind::RateOfChange => "roc",
            FeatureKind::Ppo => "ppo",
            FeatureKind::Mfi => "mfi",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureConfig {
    pub kinds: Vec<FeatureKind>,
    pub ma_windows: Vec<usize>,
    pub rsi_periods: Vec<usize>,
    pub macd: (usize, usize, usize),
    pub bollinger_period: usize,
    pub bollinger_width: f64,
    /// Shared by ATR, CCI, Williams %R and MFI.
    pub range_period: usize,
    /// Fast %K period, then the %K and %D smoothing lengths.
    pub stochastic: (usize, usize, usize),
    /// Shared by momentum and rate of change.
    pub change_period: usize,
    pub ppo: (usize, usize),
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            kinds: FeatureKind::ALL.to_vec(),
            ma_windows: vec![5, 10, 20, 50, 200],
            rsi_periods: vec![14],
            macd: (12, 26, 9),
            bollinger_period: 20,
            bollinger_width: 2.0,
            range_period: 14,
            stochastic: (5, 3, 3),
            change_period: 10,
            ppo: (12, 26),
        }
    }
}

impl FeatureConfig {
    pub fn with_kinds(kinds: Vec<FeatureKind>) -> Self {
        Self {
            kinds,
            ..Self::default()
        }
    }
}

/// One value per column for a bar. `None` until the indicator has seen enough bars.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub timestamp: i64,
    pub close: f64,
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureTable {
    pub columns: Vec<String>,
    pub rows: Vec<FeatureRow>,
}

impl FeatureTable {
    pub fn column(&self, name: &str) -> Option<Vec<Option<f64>>> {
        let idx = self.columns.iter().position(|column| column == name)?;
        Some(self.rows.iter().map(|row| row.values[idx]).collect())
    }
}

enum Calc {
    Sma(Vec<(usize, SimpleMovingAverage)>),
    Ema(Vec<(usize, ExponentialMovingAverage)>),
    Macd {
        ind: MovingAverageConvergenceDivergence,
        lookback: usize,
    },
    Rsi(Vec<(usize, RelativeStrengthIndex)>),
    Bollinger {
        ind: BollingerBands,
        lookback: usize,
    },
    Atr {
        ind: AverageTrueRange,
        lookback: usize,
    },
    Obv(OnBalanceVolume),
    Cci {
        ind: CommodityChannelIndex,
        lookback: usize,
    },
    Stochastic {
        fast: FastStochastic,
        slow_k: SimpleMovingAverage,
        slow_d: SimpleMovingAverage,
        periods: (usize, usize, usize),
    },
    WilliamsR {
        highest: Maximum,
        lowest: Minimum,
        lookback: usize,
    },
    Momentum {
        period: usize,
        closes: VecDeque<f64>,
    },
    RateOfChange {
        ind: RateOfChange,
        lookback: usize,
    },
    Ppo {
        ind: PercentagePriceOscillator,
        lookback: usize,
    },
    Mfi {
        ind: MoneyFlowIndex,
        lookback: usize,
    },
}

fn ta_err(kind: FeatureKind) -> impl Fn(ta::errors::TaError) -> String {
    move |err| format!("invalid {} parameters: {err}", kind.as_str())
}

fn ratio(num: f64, den: f64) -> Option<f64> {
    (den != 0.0).then(|| num / den).filter(|value| value.is_finite())
}

fn ready(seen: usize, lookback: usize, value: f64) -> Option<f64> {
    (seen >= lookback && value.is_finite()).then_some(value)
}

impl Calc {
    fn new(kind: FeatureKind, config: &FeatureConfig) -> Result<Self, String> {
        let err = ta_err(kind);
        let calc = match kind {
            FeatureKind::Sma => Calc::Sma(
                config
                    .ma_windows
                    .iter()
                    .map(|&w| SimpleMovingAverage::new(w).map(|ind| (w, ind)))
                    .collect::<Result<_, _>>()
                    .map_err(&err)?,
            ),
            FeatureKind::Ema => Calc::Ema(
                config
                    .ma_windows
                    .iter()
                    .map(|&w| ExponentialMovingAverage::new(w).map(|ind| (w, ind)))
                    .collect::<Result<_, _>>()
                    .map_err(&err)?,
            ),
            FeatureKind::Macd => {
                let (fast, slow, signal) = config.macd;
                Calc::Macd {
                    ind: MovingAverageConvergenceDivergence::new(fast, slow, signal)
                        .map_err(&err)?,
                    lookback: (slow + signal).saturating_sub(2),
                }
            }
            FeatureKind::Rsi => Calc::Rsi(
                config
                    .rsi_periods
                    .iter()
                    .map(|&p| RelativeStrengthIndex::new(p).map(|ind| (p, ind)))
                    .collect::<Result<_, _>>()
                    .map_err(&err)?,
            ),
            FeatureKind::Bollinger => Calc::Bollinger {
                ind: BollingerBands::new(config.bollinger_period, config.bollinger_width)
                    .map_err(&err)?,
                lookback: config.bollinger_period.saturating_sub(1),
            },
            FeatureKind::Atr => Calc::Atr {
                ind: AverageTrueRange::new(config.range_period).map_err(&err)?,
                lookback: config.range_period,
            },
            FeatureKind::Obv => Calc::Obv(OnBalanceVolume::new()),
            FeatureKind::Cci => Calc::Cci {
                ind: CommodityChannelIndex::new(config.range_period).map_err(&err)?,
                lookback: config.range_period.saturating_sub(1),
            },
            FeatureKind::Stochastic => {
                let (fast_k, slow_k, slow_d) = config.stochastic;
                Calc::Stochastic {
                    fast: FastStochastic::new(fast_k).map_err(&err)?,
                    slow_k: SimpleMovingAverage::new(slow_k).map_err(&err)?,
                    slow_d: SimpleMovingAverage::new(slow_d).map_err(&err)?,
                    periods: config.stochastic,
                }
            }
            FeatureKind::WilliamsR => Calc::WilliamsR {
                highest: Maximum::new(config.range_period).map_err(&err)?,
                lowest: Minimum::new(config.range_period).map_err(&err)?,
                lookback: config.range_period.saturating_sub(1),
            },
            FeatureKind::Momentum => {
                if config.change_period == 0 {
                    return Err("invalid mom parameters: period must be positive".to_string());
                }
                Calc::Momentum {
                    period: config.change_period,
                    closes: VecDeque::with_capacity(config.change_period + 1),
                }
            }
            FeatureKind::RateOfChange => Calc::RateOfChange {
                ind: RateOfChange::new(config.change_period).map_err(&err)?,
                lookback: config.change_period,
            },
            FeatureKind::Ppo => {
                let (fast, slow) = config.ppo;
                Calc::Ppo {
                    ind: PercentagePriceOscillator::new(fast, slow, 9).map_err(&err)?,
                    lookback: slow.saturating_sub(1),
                }
            }
            FeatureKind::Mfi => Calc::Mfi {
                ind: MoneyFlowIndex::new(config.range_period).map_err(&err)?,
                lookback: config.range_period,
            },
        };
        Ok(calc)
    }

    fn columns(&self) -> Vec<String> {
        match self {
            Calc::Sma(windows) => windows.iter().map(|(w, _)| format!("sma_{w}")).collect(),
            Calc::Ema(windows) => windows.iter().map(|(w, _)| format!("ema_{w}")).collect(),
            Calc::Macd { .. } => names(&["macd", "macd_signal", "macd_hist"]),
            Calc::Rsi(periods) => periods.iter().map(|(p, _)| format!("rsi_{p}")).collect(),
            Calc::Bollinger { .. } => names(&[
                "bb_upper",
                "bb_middle",
                "bb_lower",
                "bb_width",
                "bb_position",
            ]),
            Calc::Atr { .. } => names(&["atr"]),
            Calc::Obv(_) => names(&["obv"]),
            Calc::Cci { .. } => names(&["cci"]),
            Calc::Stochastic { .. } => names(&["slowk", "slowd", "slowj"]),
            Calc::WilliamsR { .. } => names(&["willr"]),
            Calc::Momentum { period, .. } => vec![format!("mom_{period}")],
            Calc::RateOfChange { lookback, .. } => vec![format!("roc_{lookback}")],
            Calc::Ppo { .. } => names(&["ppo"]),
            Calc::Mfi { .. } => names(&["mfi"]),
        }
    }

    /// `seen` is the number of bars fed before this one.
    fn update(&mut self, bar: &Bar, seen: usize, out: &mut Vec<Option<f64>>) {
        match self {
            Calc::Sma(windows) => {
                for (w, ind) in windows.iter_mut() {
                    let value = ind.next(bar.close);
                    out.push(ready(seen, *w - 1, value));
                }
            }
            Calc::Ema(windows) => {
                for (w, ind) in windows.iter_mut() {
                    let value = ind.next(bar.close);
                    out.push(ready(seen, *w - 1, value));
                }
            }
            Calc::Macd { ind, lookback } => {
                let value = ind.next(bar.close);
                out.push(ready(seen, *lookback, value.macd));
                out.push(ready(seen, *lookback, value.signal));
                out.push(ready(seen, *lookback, value.histogram));
            }
            Calc::Rsi(periods) => {
                for (p, ind) in periods.iter_mut() {
                    let value = ind.next(bar.close);
                    out.push(ready(seen, *p, value));
                }
            }
            Calc::Bollinger { ind, lookback } => {
                let bands = ind.next(bar.close);
                let warm = seen >= *lookback;
                out.push(ready(seen, *lookback, bands.upper));
                out.push(ready(seen, *lookback, bands.average));
                out.push(ready(seen, *lookback, bands.lower));
                let spread = bands.upper - bands.lower;
                out.push(ratio(spread, bands.average).filter(|_| warm));
                out.push(ratio(bar.close - bands.lower, spread).filter(|_| warm));
            }
            Calc::Atr { ind, lookback } => out.push(ready(seen, *lookback, ind.next(bar))),
            Calc::Obv(ind) => out.push(ready(seen, 0, ind.next(bar))),
            Calc::Cci { ind, lookback } => out.push(ready(seen, *lookback, ind.next(bar))),
            Calc::Stochastic {
                fast,
                slow_k,
                slow_d,
                periods: (fast_k, k_len, d_len),
            } => {
                let raw_k = fast.next(bar);
                let k_ready = *fast_k - 1;
                let d_ready = k_ready + *k_len - 1;
                let lookback = d_ready + *d_len - 1;
                // Smoothing starts once the raw %K covers a full window.
                let k = (seen >= k_ready).then(|| slow_k.next(raw_k));
                let d = k.filter(|_| seen >= d_ready).map(|k| slow_d.next(k));
                match (k, d) {
                    (Some(k), Some(d)) if seen >= lookback => {
                        out.push(Some(k));
                        out.push(Some(d));
                        out.push(Some(3.0 * k - 2.0 * d));
                    }
                    _ => out.extend([None, None, None]),
                }
            }
            Calc::WilliamsR {
                highest,
                lowest,
                lookback,
            } => {
                let high = highest.next(bar);
                let low = lowest.next(bar);
                let value = if high == low {
                    Some(0.0)
                } else {
                    ratio(high - bar.close, high - low).map(|r| r * -100.0)
                };
                out.push(value.filter(|_| seen >= *lookback));
            }
            Calc::Momentum { period, closes } => {
                closes.push_back(bar.close);
                if closes.len() > *period + 1 {
                    closes.pop_front();
                }
                let value = (closes.len() == *period + 1)
                    .then(|| closes.front().map(|first| bar.close - first))
                    .flatten();
                out.push(value);
            }
            Calc::RateOfChange { ind, lookback } => {
                out.push(ready(seen, *lookback, ind.next(bar.close)))
            }
            Calc::Ppo { ind, lookback } => {
                out.push(ready(seen, *lookback, ind.next(bar.close).ppo))
            }
            Calc::Mfi { ind, lookback } => out.push(ready(seen, *lookback, ind.next(bar))),
        }
    }
}

fn names(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| item.to_string()).collect()
}

/// Streams bars through the configured indicators, one row per bar.
pub struct FeatureBuilder {
    calcs: Vec<Calc>,
    columns: Vec<String>,
    seen: usize,
}

impl FeatureBuilder {
    pub fn new(config: &FeatureConfig) -> Result<Self, String> {
        let mut kinds: Vec<FeatureKind> = Vec::new();
        for kind in &config.kinds {
            if !kinds.contains(kind) {
                kinds.push(*kind);
            }
        }
        let calcs = kinds
            .into_iter()
            .map(|kind| Calc::new(kind, config))
            .collect::<Result<Vec<_>, _>>()?;
        let columns = calcs.iter().flat_map(Calc::columns).collect();
        Ok(Self {
            calcs,
            columns,
            seen: 0,
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn update(&mut self, bar: &Bar) -> FeatureRow {
        let mut values = Vec::with_capacity(self.columns.len());
        for calc in &mut self.calcs {
            calc.update(bar, self.seen, &mut values);
        }
        self.seen += 1;
        FeatureRow {
            timestamp: bar.timestamp,
            close: bar.close,
            values,
        }
    }
}

pub fn build_features(bars: &[Bar], config: &FeatureConfig) -> Result<FeatureTable, String> {
    let mut builder = FeatureBuilder::new(config)?;
    let rows = bars.iter().map(|bar| builder.update(bar)).collect();
    Ok(FeatureTable {
        columns: builder.columns,
        rows,
    })
}
