pub mod artifacts;
pub mod exchange;
pub mod storage;
