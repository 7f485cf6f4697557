use crate::value_objects::bar::Bar;
use crate::value_objects::timeframe::Timeframe;
use tracing::{debug, info};

#[derive(Debug, Default, Clone, PartialEq)]
pub struct DataQualityReport {
    pub rows: usize,
    pub duplicates: usize,
    pub gaps: usize,
    pub out_of_order: usize,
    pub invalid_close: usize,
    pub first_timestamp: Option<i64>,
    pub last_timestamp: Option<i64>,
    pub first_gap: Option<i64>,
    pub max_gap_seconds: Option<i64>,
}

impl DataQualityReport {
    pub fn is_clean(&self) -> bool {
        self.duplicates == 0 && self.out_of_order == 0 && self.invalid_close == 0
    }
}

pub fn data_quality_from_bars(
    bars: &[Bar],
    expected_step_seconds: Option<i64>,
) -> DataQualityReport {
    let mut report = DataQualityReport {
        rows: bars.len(),
        ..DataQualityReport::default()
    };
    let (Some(first), Some(last)) = (bars.first(), bars.last()) else {
        return report;
    };
    report.first_timestamp = Some(first.timestamp);
    report.last_timestamp = Some(last.timestamp);

    let step = expected_step_seconds.unwrap_or(1).max(1);
    let mut last_ts: Option<i64> = None;
    for bar in bars {
        let ts = bar.timestamp;
        if !bar.close.is_finite() || bar.close <= 0.0 {
            report.invalid_close += 1;
        }

        if let Some(prev) = last_ts {
            if ts == prev {
                report.duplicates += 1;
            } else if ts < prev {
                report.out_of_order += 1;
            } else {
                let diff = ts - prev;
                if diff > step {
                    report.gaps += 1;
                    report.first_gap.get_or_insert(ts);
                    report.max_gap_seconds =
                        Some(report.max_gap_seconds.map_or(diff, |gap| gap.max(diff)));
                }
            }
        }
        last_ts = Some(ts);
    }
    report
}

/// Sorts by timestamp and keeps the first bar seen at each timestamp.
pub fn canonicalize_bars(mut bars: Vec<Bar>) -> Vec<Bar> {
    bars.sort_by_key(|bar| bar.timestamp);
    bars.dedup_by_key(|bar| bar.timestamp);
    bars
}

/// Existing rows win over incoming rows at the same timestamp.
pub fn merge_bars(existing: Vec<Bar>, incoming: Vec<Bar>) -> Vec<Bar> {
    let mut merged = existing;
    merged.extend(incoming);
    canonicalize_bars(merged)
}

/// Keeps bars with `start <= timestamp <= end`. Open bounds are unbounded.
pub fn filter_range(bars: Vec<Bar>, start: Option<i64>, end: Option<i64>) -> Vec<Bar> {
    bars.into_iter()
        .filter(|bar| start.map_or(true, |s| bar.timestamp >= s))
        .filter(|bar| end.map_or(true, |e| bar.timestamp <= e))
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct PriceSummary {
    pub rows: usize,
    pub first_timestamp: i64,
    pub last_timestamp: i64,
    pub last_close: f64,
    pub highest_close: f64,
    pub lowest_close: f64,
}

pub fn price_summary(bars: &[Bar]) -> Option<PriceSummary> {
    let first = bars.first()?;
    let last = bars.last()?;
    let (low, high) = bars.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), bar| {
        (lo.min(bar.close), hi.max(bar.close))
    });
    Some(PriceSummary {
        rows: bars.len(),
        first_timestamp: first.timestamp,
        last_timestamp: last.timestamp,
        last_close: last.close,
        highest_close: high,
        lowest_close: low,
    })
}

/// How missing (non-finite) price and volume values are filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FillMethod {
    /// Carry the previous value forward; leading gaps take the next value.
    #[default]
    Forward,
    /// Carry the next value backward; trailing gaps take the previous value.
    Backward,
    /// Linear between neighbours; the ends fall back to forward then backward fill.
    Interpolate,
}

impl FillMethod {
    pub fn parse(value: &str) -> Result<Self, String> {
        match value.trim().to_lowercase().as_str() {
            "ffill" | "forward" => Ok(FillMethod::Forward),
            "bfill" | "backward" => Ok(FillMethod::Backward),
            "interpolate" | "linear" => Ok(FillMethod::Interpolate),
            other => Err(format!("unsupported fill method: {other}")),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FillMethod::Forward => "ffill",
            FillMethod::Backward => "bfill",
            FillMethod::Interpolate => "interpolate",
        }
    }
}

/// Closes further than this many standard deviations from the mean are smoothed.
pub const OUTLIER_Z_SCORE: f64 = 3.0;
/// Trailing bars, the outlier included, averaged to replace an outlier close.
pub const OUTLIER_WINDOW: usize = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleaningReport {
    pub filled: usize,
    pub outliers: usize,
    /// Bars still missing a value after filling, e.g. when a whole column was blank.
    pub dropped: usize,
}

#[derive(Debug, Clone, Copy)]
enum Field {
    Open,
    High,
    Low,
    Close,
    Volume,
}

impl Field {
    const ALL: [Field; 5] = [
        Field::Open,
        Field::High,
        Field::Low,
        Field::Close,
        Field::Volume,
    ];

    fn slot(self, bar: &mut Bar) -> &mut f64 {
        match self {
            Field::Open => &mut bar.open,
            Field::High => &mut bar.high,
            Field::Low => &mut bar.low,
            Field::Close => &mut bar.close,
            Field::Volume => &mut bar.volume,
        }
    }
}

fn forward_fill(values: &mut [f64]) {
    let mut last = None;
    for value in values.iter_mut() {
        if value.is_finite() {
            last = Some(*value);
        } else if let Some(prev) = last {
            *value = prev;
        }
    }
}

fn backward_fill(values: &mut [f64]) {
    let mut next = None;
    for value in values.iter_mut().rev() {
        if value.is_finite() {
            next = Some(*value);
        } else if let Some(after) = next {
            *value = after;
        }
    }
}

fn interpolate(values: &mut [f64]) {
    let mut prev: Option<usize> = None;
    for idx in 0..values.len() {
        if !values[idx].is_finite() {
            continue;
        }
        if let Some(start) = prev {
            let span = idx - start;
            if span > 1 {
                let (from, to) = (values[start], values[idx]);
                for (offset, slot) in values[start + 1..idx].iter_mut().enumerate() {
                    *slot = from + (to - from) * (offset + 1) as f64 / span as f64;
                }
            }
        }
        prev = Some(idx);
    }
}

/// Fills missing values column by column, then smooths close outliers by z-score.
///
/// Bars are expected sorted. Outliers are judged against the mean and sample standard
/// deviation of the filled closes; each is replaced by the mean of the trailing
/// `OUTLIER_WINDOW` closes as already smoothed.
pub fn clean_bars(bars: Vec<Bar>, method: FillMethod) -> (Vec<Bar>, CleaningReport) {
    let mut bars = bars;
    let mut report = CleaningReport::default();
    if bars.is_empty() {
        return (bars, report);
    }

    for field in Field::ALL {
        let mut column: Vec<f64> = bars.iter_mut().map(|bar| *field.slot(bar)).collect();
        let missing = column.iter().filter(|value| !value.is_finite()).count();
        if missing == 0 {
            continue;
        }
        match method {
            FillMethod::Forward => {
                forward_fill(&mut column);
                backward_fill(&mut column);
            }
            FillMethod::Backward => {
                backward_fill(&mut column);
                forward_fill(&mut column);
            }
            FillMethod::Interpolate => {
                interpolate(&mut column);
                forward_fill(&mut column);
                backward_fill(&mut column);
            }
        }
        for (bar, value) in bars.iter_mut().zip(&column) {
            let slot = field.slot(bar);
            if !slot.is_finite() && value.is_finite() {
                report.filled += 1;
            }
            *slot = *value;
        }
        debug!(field = ?field, missing, "filled missing values");
    }

    let before = bars.len();
    bars.retain(|bar| {
        [bar.open, bar.high, bar.low, bar.close, bar.volume]
            .iter()
            .all(|value| value.is_finite())
    });
    report.dropped = before - bars.len();

    report.outliers = smooth_close_outliers(&mut bars);
    if report.filled > 0 || report.outliers > 0 || report.dropped > 0 {
        info!(
            method = method.as_str(),
            filled = report.filled,
            outliers = report.outliers,
            dropped = report.dropped,
            "cleaned bars"
        );
    }
    (bars, report)
}

fn smooth_close_outliers(bars: &mut [Bar]) -> usize {
    if bars.len() < 2 {
        return 0;
    }
    let n = bars.len() as f64;
    let mean = bars.iter().map(|bar| bar.close).sum::<f64>() / n;
    let var = bars
        .iter()
        .map(|bar| (bar.close - mean).powi(2))
        .sum::<f64>()
        / (n - 1.0);
    let std = var.sqrt();
    if std == 0.0 || !std.is_finite() {
        return 0;
    }

    let flagged: Vec<usize> = bars
        .iter()
        .enumerate()
        .filter(|(_, bar)| ((bar.close - mean) / std).abs() > OUTLIER_Z_SCORE)
        .map(|(idx, _)| idx)
        .collect();
    for &idx in &flagged {
        let from = (idx + 1).saturating_sub(OUTLIER_WINDOW);
        let window = &bars[from..=idx];
        let smoothed = window.iter().map(|bar| bar.close).sum::<f64>() / window.len() as f64;
        bars[idx].close = smoothed;
    }
    flagged.len()
}

/// Aggregates bars into `target` buckets aligned to the epoch: first open, highest high,
/// lowest low, last close and summed volume. Empty buckets produce no bar.
pub fn resample_bars(bars: Vec<Bar>, target: &Timeframe) -> Vec<Bar> {
    let step = target.step_seconds.max(1);
    let mut out: Vec<Bar> = Vec::new();
    for bar in canonicalize_bars(bars) {
        let bucket = bar.timestamp.div_euclid(step) * step;
        match out.last_mut() {
            Some(current) if current.timestamp == bucket => {
                current.high = current.high.max(bar.high);
                current.low = current.low.min(bar.low);
                current.close = bar.close;
                current.volume += bar.volume;
            }
            _ => out.push(Bar {
                timestamp: bucket,
                ..bar
            }),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{
        canonicalize_bars, clean_bars, data_quality_from_bars, filter_range, merge_bars,
        price_summary, resample_bars, FillMethod,
    };
    use crate::value_objects::bar::Bar;
    use crate::value_objects::timeframe::Timeframe;

    fn bar(ts: i64, close: f64) -> Bar {
        Bar::flat("BTC/USDT", ts, close)
    }

    #[test]
    fn quality_counts_duplicates_gaps_and_disorder() {
        let bars = vec![bar(0, 1.0), bar(60, 1.0), bar(60, 1.0), bar(240, 1.0), bar(180, 0.0)];
        let report = data_quality_from_bars(&bars, Some(60));
        assert_eq!(report.rows, 5);
        assert_eq!(report.duplicates, 1);
        assert_eq!(report.gaps, 1);
        assert_eq!(report.first_gap, Some(240));
        assert_eq!(report.max_gap_seconds, Some(180));
        assert_eq!(report.out_of_order, 1);
        assert_eq!(report.invalid_close, 1);
        assert!(!report.is_clean());
    }

    #[test]
    fn canonicalize_sorts_and_keeps_first() {
        let bars = vec![bar(120, 3.0), bar(60, 1.0), bar(60, 2.0)];
        let out = canonicalize_bars(bars);
        let closes: Vec<f64> = out.iter().map(|b| b.close).collect();
        assert_eq!(closes, vec![1.0, 3.0]);
    }

    #[test]
    fn merge_prefers_existing_rows() {
        let merged = merge_bars(vec![bar(0, 1.0), bar(60, 2.0)], vec![bar(60, 9.0), bar(120, 3.0)]);
        let closes: Vec<f64> = merged.iter().map(|b| b.close).collect();
        assert_eq!(closes, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn filter_range_is_inclusive() {
        let bars = vec![bar(0, 1.0), bar(60, 2.0), bar(120, 3.0)];
        assert_eq!(filter_range(bars.clone(), Some(60), Some(120)).len(), 2);
        assert_eq!(filter_range(bars.clone(), None, Some(0)).len(), 1);
        assert_eq!(filter_range(bars, None, None).len(), 3);
    }

    #[test]
    fn summary_reports_extremes() {
        let summary = price_summary(&[bar(0, 2.0), bar(60, 5.0), bar(120, 3.0)]).unwrap();
        assert_eq!(summary.rows, 3);
        assert_eq!(summary.highest_close, 5.0);
        assert_eq!(summary.lowest_close, 2.0);
        assert_eq!(summary.last_close, 3.0);
        assert!(price_summary(&[]).is_none());
    }

    fn closes(bars: &[Bar]) -> Vec<f64> {
        bars.iter().map(|b| b.close).collect()
    }

    fn gappy() -> Vec<Bar> {
        let mut bars = vec![bar(0, 1.0), bar(60, 2.0), bar(120, 3.0), bar(180, 4.0), bar(240, 5.0)];
        bars[0].close = f64::NAN;
        bars[2].close = f64::NAN;
        bars[4].close = f64::NAN;
        bars
    }

    #[test]
    fn fill_methods_cover_leading_inner_and_trailing_gaps() {
        let (forward, report) = clean_bars(gappy(), FillMethod::Forward);
        assert_eq!(closes(&forward), vec![2.0, 2.0, 2.0, 4.0, 4.0]);
        assert_eq!(report.filled, 3);

        let (backward, _) = clean_bars(gappy(), FillMethod::Backward);
        assert_eq!(closes(&backward), vec![2.0, 2.0, 4.0, 4.0, 4.0]);

        let (linear, _) = clean_bars(gappy(), FillMethod::Interpolate);
        assert_eq!(closes(&linear), vec![2.0, 2.0, 3.0, 4.0, 4.0]);
    }

    #[test]
    fn fill_method_names() {
        assert_eq!(FillMethod::parse("ffill"), Ok(FillMethod::Forward));
        assert_eq!(FillMethod::parse("BFILL"), Ok(FillMethod::Backward));
        assert_eq!(FillMethod::parse("interpolate"), Ok(FillMethod::Interpolate));
        assert!(FillMethod::parse("mean").is_err());
    }

    #[test]
    fn fully_blank_column_drops_rows() {
        let mut bars = vec![bar(0, 1.0), bar(60, 2.0)];
        for b in &mut bars {
            b.volume = f64::NAN;
        }
        let (cleaned, report) = clean_bars(bars, FillMethod::Forward);
        assert!(cleaned.is_empty());
        assert_eq!(report.dropped, 2);
        assert_eq!(report.filled, 0);
    }

    #[test]
    fn spike_is_replaced_by_trailing_mean() {
        let mut prices = vec![10.0; 20];
        prices[12] = 1_000.0;
        let bars: Vec<Bar> = prices
            .iter()
            .enumerate()
            .map(|(idx, close)| bar(idx as i64 * 60, *close))
            .collect();

        let (cleaned, report) = clean_bars(bars, FillMethod::Forward);
        assert_eq!(report.outliers, 1);
        assert_eq!(report.filled, 0);
        // Mean of 10, 10, 10, 10 and the spike itself.
        assert!((cleaned[12].close - 208.0).abs() < 1e-9);
        assert_eq!(cleaned[11].close, 10.0);
    }

    #[test]
    fn resample_aggregates_ohlcv_per_bucket() {
        let mut bars: Vec<Bar> = (0..6)
            .map(|idx| bar(3_600 + idx * 900, 10.0 + idx as f64))
            .collect();
        for (idx, b) in bars.iter_mut().enumerate() {
            b.high = b.close + 1.0;
            b.low = b.close - 1.0;
            b.volume = idx as f64 + 1.0;
        }
        bars.swap(0, 3);

        let hourly = resample_bars(bars, &Timeframe::parse("1h").unwrap());
        assert_eq!(hourly.len(), 2);
        let first = &hourly[0];
        assert_eq!(first.timestamp, 3_600);
        assert_eq!(first.open, 10.0);
        assert_eq!(first.high, 14.0);
        assert_eq!(first.low, 9.0);
        assert_eq!(first.close, 13.0);
        assert_eq!(first.volume, 10.0);
        let second = &hourly[1];
        assert_eq!(second.timestamp, 7_200);
        assert_eq!((second.open, second.close, second.volume), (14.0, 15.0, 11.0));
    }

    #[test]
    fn resample_skips_empty_buckets() {
        let bars = vec![bar(0, 1.0), bar(10_800, 2.0)];
        let hourly = resample_bars(bars, &Timeframe::parse("1h").unwrap());
        let stamps: Vec<i64> = hourly.iter().map(|b| b.timestamp).collect();
        assert_eq!(stamps, vec![0, 10_800]);
        assert!(resample_bars(Vec::new(), &Timeframe::parse("1d").unwrap()).is_empty());
    }
}
