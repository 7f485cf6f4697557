pub mod bar;
pub mod equity_point;
pub mod signal;
pub mod ticker;
pub mod time;
pub mod timeframe;
pub mod trade_record;
