pub mod engine;
pub mod features;
pub mod ohlcv;
pub mod report;
pub mod strategy;
