pub mod artifacts;
pub mod exchanges;
pub mod reporting;
pub mod storage;
