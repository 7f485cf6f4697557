use crate::value_objects::signal::{Signal, SignalType};
use crate::value_objects::trade_record::{TradeDirection, TradeRecord};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Whether a SELL from flat may open a short.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionMode {
    #[default]
    LongShort,
    LongOnly,
}

impl PositionMode {
    pub fn parse(value: &str) -> Result<Self, String> {
        match value.trim().to_lowercase().replace('-', "_").as_str() {
            "long_short" => Ok(PositionMode::LongShort),
            "long_only" => Ok(PositionMode::LongOnly),
            other => Err(format!("unknown position mode: {other}")),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PositionMode::LongShort => "long_short",
            PositionMode::LongOnly => "long_only",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExecutionConfig {
    pub fee_rate: f64,
    pub slippage: f64,
    pub position_size: f64,
    pub mode: PositionMode,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            fee_rate: 0.001,
            slippage: 0.0005,
            position_size: 0.1,
            mode: PositionMode::LongShort,
        }
    }
}

/// What a single `process_signal` call did to the ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SignalOutcome {
    pub closed: Option<TradeDirection>,
    pub opened: Option<TradeDirection>,
    pub rejected: bool,
}

impl SignalOutcome {
    pub fn is_noop(&self) -> bool {
        self.closed.is_none() && self.opened.is_none() && !self.rejected
    }
}

/// Single-asset position ledger.
///
/// `position` is signed: positive is long, negative is short, zero is flat.
/// An open trade exists exactly when the position is non-zero.
#[derive(Debug, Clone)]
pub struct Ledger {
    config: ExecutionConfig,
    capital: f64,
    position: f64,
    position_value: f64,
    open_trade: Option<TradeRecord>,
    trades: Vec<TradeRecord>,
}

impl Ledger {
    pub fn new(initial_capital: f64, config: ExecutionConfig) -> Self {
        Self {
            config,
            capital: initial_capital,
            position: 0.0,
            position_value: 0.0,
            open_trade: None,
            trades: Vec::new(),
        }
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    pub fn capital(&self) -> f64 {
        self.capital
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn position_value(&self) -> f64 {
        self.position_value
    }

    pub fn open_trade(&self) -> Option<&TradeRecord> {
        self.open_trade.as_ref()
    }

    pub fn trades(&self) -> &[TradeRecord] {
        &self.trades
    }

    pub fn into_trades(self) -> Vec<TradeRecord> {
        self.trades
    }

    pub fn is_flat(&self) -> bool {
        self.position == 0.0
    }

    /// Capital plus the last marked position value.
    pub fn equity(&self) -> f64 {
        self.capital + self.position_value
    }

    pub fn mark(&mut self, price: f64) {
        self.position_value = self.position * price;
    }

    pub fn process_signal(&mut self, signal: &Signal, mark_price: f64) -> SignalOutcome {
        let mut outcome = SignalOutcome::default();
        match signal.signal_type {
            SignalType::Buy => {
                if self.position < 0.0 {
                    self.cover_short(signal.timestamp, mark_price);
                    outcome.closed = Some(TradeDirection::Short);
                }
                if self.is_flat() && !signal.is_close_position() {
                    if self.open(signal, mark_price, TradeDirection::Long) {
                        outcome.opened = Some(TradeDirection::Long);
                    } else {
                        outcome.rejected = true;
                    }
                }
            }
            SignalType::Sell => {
                if self.position > 0.0 {
                    self.close_long(signal.timestamp, mark_price);
                    outcome.closed = Some(TradeDirection::Long);
                }
                let may_short = self.config.mode == PositionMode::LongShort;
                if self.is_flat() && may_short && !signal.is_close_position() {
                    if self.open(signal, mark_price, TradeDirection::Short) {
                        outcome.opened = Some(TradeDirection::Short);
                    } else {
                        outcome.rejected = true;
                    }
                }
            }
            SignalType::Hold => {}
        }
        self.mark(mark_price);
        outcome
    }

    /// Closes whatever is open at `price`. Never opens a new position.
    pub fn force_close(&mut self, timestamp: i64, price: f64) -> Option<TradeDirection> {
        let closed = if self.position > 0.0 {
            self.close_long(timestamp, price);
            Some(TradeDirection::Long)
        } else if self.position < 0.0 {
            self.cover_short(timestamp, price);
            Some(TradeDirection::Short)
        } else {
            None
        };
        self.mark(price);
        closed
    }

    fn open(&mut self, signal: &Signal, mark_price: f64, direction: TradeDirection) -> bool {
        let fill = match direction {
            TradeDirection::Long => mark_price * (1.0 + self.config.slippage),
            TradeDirection::Short => mark_price * (1.0 - self.config.slippage),
        };
        let budget = self.capital * self.config.position_size;
        let quantity = budget / fill;
        let notional = quantity * fill;
        let fee = notional * self.config.fee_rate;

        let affordable = quantity.is_finite()
            && quantity > 0.0
            && notional.is_finite()
            && notional + fee <= self.capital;
        if !affordable {
            warn!(
                signal = %signal,
                capital = self.capital,
                required = notional + fee,
                "insufficient capital, entry rejected"
            );
            return false;
        }

        match direction {
            TradeDirection::Long => {
                self.capital -= notional + fee;
                self.position = quantity;
            }
            TradeDirection::Short => {
                self.capital += notional - fee;
                self.position = -quantity;
            }
        }
        self.open_trade = Some(TradeRecord::open(
            &signal.symbol,
            direction,
            signal.timestamp,
            fill,
            quantity,
            fee,
        ));
        true
    }

    fn close_long(&mut self, timestamp: i64, mark_price: f64) {
        let quantity = self.position;
        let fill = mark_price * (1.0 - self.config.slippage);
        let proceeds = quantity * fill;
        let fee = proceeds * self.config.fee_rate;
        self.capital += proceeds - fee;
        self.settle(timestamp, fill, fee);
    }

    fn cover_short(&mut self, timestamp: i64, mark_price: f64) {
        let quantity = self.position.abs();
        let fill = mark_price * (1.0 + self.config.slippage);
        let cost = quantity * fill;
        let fee = cost * self.config.fee_rate;
        self.capital -= cost + fee;
        self.settle(timestamp, fill, fee);
    }

    fn settle(&mut self, timestamp: i64, fill: f64, fee: f64) {
        self.position = 0.0;
        self.position_value = 0.0;
        if let Some(mut trade) = self.open_trade.take() {
            trade.close(timestamp, fill, fee);
            self.trades.push(trade);
        }
    }
}
