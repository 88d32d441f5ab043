/// Calendar arithmetic for date buckets.
///
/// Bucket keys are formatted per granularity:
///
/// | period | format     | example      |
/// |--------|------------|--------------|
/// | day    | `%Y-%m-%d` | `2024-01-31` |
/// | week   | `%G-W%V`   | `2024-W05`   |
/// | month  | `%Y-%m`    | `2024-01`    |
/// | year   | `%Y`       | `2024`       |
///
/// Weeks are ISO weeks: they start on Monday and belong to the ISO week-year,
/// so `2024-12-30` is in `2025-W01`.
use crate::error::{ChartError, ChartResult};
use crate::record::FieldValue;
use crate::types::Period;
use chrono::{DateTime, Datelike, Days, Months, NaiveDate, NaiveDateTime, NaiveTime, Weekday};

/// Format used to parse raw date values when none is configured.
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Formats tried, in order, when reading dates without a configured format.
const LENIENT_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
];

impl Period {
    /// chrono format string of this period's bucket keys.
    pub fn key_format(&self) -> &'static str {
        match self {
            Period::Day => "%Y-%m-%d",
            Period::Week => "%G-W%V",
            Period::Month => "%Y-%m",
            Period::Year => "%Y",
        }
    }

    /// Bucket key of the period containing `date`.
    pub fn key(&self, date: NaiveDate) -> String {
        date.format(self.key_format()).to_string()
    }

    /// First day of the period containing `date`.
    pub fn start_of(&self, date: NaiveDate) -> NaiveDate {
        match self {
            Period::Day => date,
            Period::Week => date - Days::new(u64::from(date.weekday().num_days_from_monday())),
            Period::Month => date - Days::new(u64::from(date.day0())),
            Period::Year => date - Days::new(u64::from(date.ordinal0())),
        }
    }

    /// Start of the period after the one starting at `start`.
    ///
    /// Returns `None` past the end of chrono's representable range.
    pub fn next(&self, start: NaiveDate) -> Option<NaiveDate> {
        match self {
            Period::Day => start.checked_add_days(Days::new(1)),
            Period::Week => start.checked_add_days(Days::new(7)),
            Period::Month => start.checked_add_months(Months::new(1)),
            Period::Year => start.checked_add_months(Months::new(12)),
        }
    }

    /// Parse a bucket key back to the first day of its period.
    pub fn parse_key(&self, key: &str) -> ChartResult<NaiveDate> {
        let parsed = match self {
            Period::Day => NaiveDate::parse_from_str(key, "%Y-%m-%d").ok(),
            Period::Week => key.split_once("-W").and_then(|(year, week)| {
                NaiveDate::from_isoywd_opt(year.parse().ok()?, week.parse().ok()?, Weekday::Mon)
            }),
            Period::Month => key.split_once('-').and_then(|(year, month)| {
                NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, 1)
            }),
            Period::Year => key
                .parse()
                .ok()
                .and_then(|year| NaiveDate::from_ymd_opt(year, 1, 1)),
        };

        parsed.ok_or_else(|| ChartError::ParseError {
            value: key.to_string(),
            format: self.key_format().to_string(),
        })
    }
}

/// Parse a raw date value with an explicit chrono format.
///
/// Formats without time fields yield midnight.
pub fn parse_with_format(raw: &str, format: &str) -> ChartResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, format)
        .or_else(|_| NaiveDate::parse_from_str(raw, format).map(|d| d.and_time(NaiveTime::MIN)))
        .map_err(|_| ChartError::ParseError {
            value: raw.to_string(),
            format: format.to_string(),
        })
}

/// Parse a raw date value trying common ISO-8601 layouts.
pub fn parse_lenient(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    LENIENT_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.naive_local())
        })
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

/// Calendar date of a field value, if it holds one.
///
/// Text is read with `format` when one is given, then with the lenient
/// ISO-8601 layouts.
pub fn date_of(value: &FieldValue, format: Option<&str>) -> Option<NaiveDate> {
    match value {
        FieldValue::Timestamp(ts) => Some(ts.date()),
        FieldValue::Text(s) => format
            .and_then(|format| parse_with_format(s.trim(), format).ok())
            .or_else(|| parse_lenient(s))
            .map(|dt| dt.date()),
        _ => None,
    }
}
