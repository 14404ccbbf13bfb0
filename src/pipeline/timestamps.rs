//! Lenient `last_review` parsing.
//!
//! Anything that cannot be read as a point in time becomes `None`; no value
//! in this column is ever an error.

use crate::error::Result;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use polars::prelude::*;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Parses one textual timestamp into seconds since the Unix epoch.
///
/// Naive values are read as UTC.
pub fn parse_timestamp(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(epoch_seconds(dt.naive_utc()));
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(epoch_seconds(naive));
        }
    }

    DATE_FORMATS.iter().find_map(|fmt| {
        NaiveDate::parse_from_str(text, fmt)
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(epoch_seconds)
    })
}

fn epoch_seconds(naive: NaiveDateTime) -> f64 {
    let utc = naive.and_utc();
    utc.timestamp() as f64 + f64::from(utc.timestamp_subsec_nanos()) / 1e9
}

/// Reads a `last_review` column of any supported dtype as epoch seconds.
///
/// Text is parsed, dates and datetimes are converted, and numbers are taken
/// to already be epoch seconds (NaN counts as missing).
pub fn to_epoch_seconds(series: &Series) -> Result<Vec<Option<f64>>> {
    let seconds = match series.dtype() {
        DataType::String => series
            .str()?
            .into_iter()
            .map(|v| v.and_then(parse_timestamp))
            .collect(),
        DataType::Null => vec![None; series.len()],
        DataType::Date => series
            .cast(&DataType::Int32)?
            .i32()?
            .into_iter()
            .map(|days| days.map(|d| f64::from(d) * SECONDS_PER_DAY))
            .collect(),
        DataType::Datetime(unit, _) => {
            let per_second = match unit {
                TimeUnit::Nanoseconds => 1e9,
                TimeUnit::Microseconds => 1e6,
                TimeUnit::Milliseconds => 1e3,
            };
            series
                .cast(&DataType::Int64)?
                .i64()?
                .into_iter()
                .map(|ticks| ticks.map(|t| t as f64 / per_second))
                .collect()
        }
        dtype if dtype.is_float() || dtype.is_integer() => series
            .cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .map(|v| v.filter(|s| s.is_finite()))
            .collect(),
        _ => series
            .cast(&DataType::String)?
            .str()?
            .into_iter()
            .map(|v| v.and_then(parse_timestamp))
            .collect(),
    };
    Ok(seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_date() {
        assert_eq!(parse_timestamp("2019-05-21"), Some(1_558_396_800.0));
    }

    #[test]
    fn test_parse_datetime_variants() {
        let expected = Some(1_558_441_845.0);
        assert_eq!(parse_timestamp("2019-05-21 12:30:45"), expected);
        assert_eq!(parse_timestamp("2019-05-21T12:30:45"), expected);
        assert_eq!(parse_timestamp("2019-05-21T12:30:45Z"), expected);
        assert_eq!(parse_timestamp("2019-05-21T14:30:45+02:00"), expected);
    }

    #[test]
    fn test_parse_fractional_seconds() {
        assert_eq!(parse_timestamp("1970-01-01 00:00:01.5"), Some(1.5));
    }

    #[test]
    fn test_parse_alternate_date_orders() {
        assert_eq!(parse_timestamp("2019/05/21"), Some(1_558_396_800.0));
        assert_eq!(parse_timestamp("05/21/2019"), Some(1_558_396_800.0));
    }

    #[test]
    fn test_garbage_is_missing() {
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("   "), None);
        assert_eq!(parse_timestamp("not a date"), None);
        assert_eq!(parse_timestamp("2019-13-45"), None);
    }

    #[test]
    fn test_string_series_to_seconds() -> Result<()> {
        let s = Series::new(
            "last_review".into(),
            vec![Some("1970-01-02"), None, Some("junk")],
        );
        assert_eq!(to_epoch_seconds(&s)?, vec![Some(86_400.0), None, None]);
        Ok(())
    }

    #[test]
    fn test_numeric_series_passes_through() -> Result<()> {
        let s = Series::new("last_review".into(), vec![Some(12.25), Some(f64::NAN), None]);
        assert_eq!(to_epoch_seconds(&s)?, vec![Some(12.25), None, None]);
        Ok(())
    }

    #[test]
    fn test_datetime_series_to_seconds() -> Result<()> {
        let s = Series::new("last_review".into(), vec![Some(1_500_i64), None])
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?;
        assert_eq!(to_epoch_seconds(&s)?, vec![Some(1.5), None]);
        Ok(())
    }
}
