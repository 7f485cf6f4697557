pub mod backtesting;
pub mod config;
pub mod download;
pub mod processing;
pub mod reporting;
mod shared;
pub mod signals;
pub mod storage_admin;
