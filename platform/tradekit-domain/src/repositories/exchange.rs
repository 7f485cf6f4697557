use crate::value_objects::bar::Bar;
use crate::value_objects::ticker::Ticker;
use crate::value_objects::timeframe::Timeframe;

/// How consecutive `fetch_ohlcv` pages move through history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageCursor {
    /// The first `limit` bars at or after `since`. A short page means history ran out.
    #[default]
    FromStart,
    /// Only the bars inside `[since, since + limit * step)`. Short or empty pages are holes
    /// in the exchange's history, not its end.
    FixedWindow,
}

/// Read-only market data from a spot exchange.
pub trait ExchangeProvider {
    fn name(&self) -> &str;

    /// Largest page the exchange serves in one request.
    fn max_limit(&self) -> usize;

    fn page_cursor(&self) -> PageCursor {
        PageCursor::FromStart
    }

    /// Bars with `timestamp >= since`, ascending, at most `limit` of them.
    fn fetch_ohlcv(
        &self,
        symbol: &str,
        timeframe: &Timeframe,
        since: i64,
        limit: usize,
    ) -> Result<Vec<Bar>, String>;

    fn latest_price(&self, symbol: &str) -> Result<Ticker, String>;
}
