use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeDirection {
    Long,
    Short,
}

impl TradeDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeDirection::Long => "long",
            TradeDirection::Short => "short",
        }
    }

    pub fn parse(value: &str) -> Result<Self, String> {
        match value.trim().to_lowercase().as_str() {
            "long" => Ok(TradeDirection::Long),
            "short" => Ok(TradeDirection::Short),
            other => Err(format!("unknown trade direction: {other}")),
        }
    }
}

impl fmt::Display for TradeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeStatus {
    Open,
    Closed,
}

impl TradeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeStatus::Open => "open",
            TradeStatus::Closed => "closed",
        }
    }

    pub fn parse(value: &str) -> Result<Self, String> {
        match value.trim().to_lowercase().as_str() {
            "open" => Ok(TradeStatus::Open),
            "closed" => Ok(TradeStatus::Closed),
            other => Err(format!("unknown trade status: {other}")),
        }
    }
}

/// One round trip. Exit fields are filled in when the position is closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub symbol: String,
    pub direction: TradeDirection,
    pub entry_time: i64,
    pub entry_price: f64,
    pub quantity: f64,
    pub entry_fee: f64,
    pub status: TradeStatus,
    pub exit_time: Option<i64>,
    pub exit_price: Option<f64>,
    pub profit_loss: Option<f64>,
    pub profit_loss_pct: Option<f64>,
}

impl TradeRecord {
    pub fn open(
        symbol: &str,
        direction: TradeDirection,
        entry_time: i64,
        entry_price: f64,
        quantity: f64,
        entry_fee: f64,
    ) -> Self {
        Self {
            symbol: symbol.to_string(),
            direction,
            entry_time,
            entry_price,
            quantity,
            entry_fee,
            status: TradeStatus::Open,
            exit_time: None,
            exit_price: None,
            profit_loss: None,
            profit_loss_pct: None,
        }
    }

    /// Closes the trade. `profit_loss` is net of both the entry and the exit fee;
    /// `profit_loss_pct` is the price move relative to the entry price.
    pub fn close(&mut self, exit_time: i64, exit_price: f64, exit_fee: f64) {
        let per_unit = match self.direction {
            TradeDirection::Long => exit_price - self.entry_price,
            TradeDirection::Short => self.entry_price - exit_price,
        };
        let pct = if self.entry_price != 0.0 {
            per_unit / self.entry_price * 100.0
        } else {
            0.0
        };

        self.status = TradeStatus::Closed;
        self.exit_time = Some(exit_time);
        self.exit_price = Some(exit_price);
        self.profit_loss = Some(per_unit * self.quantity - self.entry_fee - exit_fee);
        self.profit_loss_pct = Some(pct);
    }

    pub fn is_closed(&self) -> bool {
        self.status == TradeStatus::Closed
    }

    pub fn duration_days(&self) -> Option<f64> {
        self.exit_time
            .map(|exit| (exit - self.entry_time) as f64 / 86_400.0)
    }
}

#[cfg(test)]
mod tests {
    use super::{TradeDirection, TradeRecord, TradeStatus};

    #[test]
    fn long_close_nets_both_fees() {
        let mut trade = TradeRecord::open("BTC/USDT", TradeDirection::Long, 0, 100.0, 10.0, 1.0);
        trade.close(86_400, 110.0, 1.1);
        assert_eq!(trade.status, TradeStatus::Closed);
        assert!((trade.profit_loss.unwrap() - 97.9).abs() < 1e-9);
        assert!((trade.profit_loss_pct.unwrap() - 10.0).abs() < 1e-9);
        assert_eq!(trade.duration_days(), Some(1.0));
    }

    #[test]
    fn short_profits_when_price_falls() {
        let mut trade = TradeRecord::open("BTC/USDT", TradeDirection::Short, 0, 100.0, 2.0, 0.0);
        trade.close(3_600, 90.0, 0.0);
        assert!((trade.profit_loss.unwrap() - 20.0).abs() < 1e-9);
        assert!((trade.profit_loss_pct.unwrap() - 10.0).abs() < 1e-9);
    }
}
