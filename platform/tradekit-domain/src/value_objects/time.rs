use chrono::{DateTime, NaiveDate, TimeZone, Utc};

pub const SECONDS_PER_DAY: i64 = 86_400;

pub fn format_timestamp(timestamp: i64) -> String {
    match Utc.timestamp_opt(timestamp, 0) {
        chrono::LocalResult::Single(dt) => dt.to_rfc3339(),
        _ => timestamp.to_string(),
    }
}

pub fn now_timestamp() -> i64 {
    Utc::now().timestamp()
}

/// Accepts `YYYY-MM-DD` (midnight UTC) or a full RFC 3339 instant.
pub fn parse_date_or_rfc3339(value: &str) -> Result<i64, String> {
    let trimmed = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        let dt = date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| format!("invalid date: {value}"))?;
        return Ok(Utc.from_utc_datetime(&dt).timestamp());
    }
    DateTime::parse_from_rfc3339(trimmed)
        .map(|dt| dt.with_timezone(&Utc).timestamp())
        .map_err(|err| format!("invalid timestamp '{value}': {err}"))
}

/// Whole days between two instants, rounded toward negative infinity.
pub fn whole_days_between(start: i64, end: i64) -> i64 {
    (end - start).div_euclid(SECONDS_PER_DAY)
}

#[cfg(test)]
mod tests {
    use super::{parse_date_or_rfc3339, whole_days_between};

    #[test]
    fn parses_plain_dates_and_rfc3339() {
        assert_eq!(parse_date_or_rfc3339("1970-01-02").unwrap(), 86_400);
        assert_eq!(
            parse_date_or_rfc3339("1970-01-01T01:00:00+00:00").unwrap(),
            3_600
        );
        assert!(parse_date_or_rfc3339("yesterday").is_err());
    }

    #[test]
    fn whole_days_floor() {
        assert_eq!(whole_days_between(0, 86_399), 0);
        assert_eq!(whole_days_between(0, 86_400 * 3 + 5), 3);
        assert_eq!(whole_days_between(10, 0), -1);
    }
}
