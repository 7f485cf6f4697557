use serde::{Deserialize, Serialize};

/// Equity sample taken at the open of a bar, before that bar's signals are applied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: i64,
    pub equity: f64,
}
