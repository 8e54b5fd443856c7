use std::path::Path;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::tab::*;

pub fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

/// Ids for rows that do not carry one, derived from the file name and the
/// line number.
pub fn make_default_id(path: &str, lineno: usize) -> String {
    format!("{}-{:08}", simplify_file_name(path), lineno)
}

/// Guesses the provider from the extension of a file.
pub fn infer_provider(path: &str) -> &'static str {
    match Path::new(path).extension().and_then(|s| s.to_str()) {
        Some("csv") => "csv",
        Some("xlsx") => "xlsx",
        _ => "json",
    }
}

/// Accepts RFC 3339 timestamps, and naive ones (read as UTC) such as
/// `2024-03-01 12:30:00` or `2024-03-01`.
pub fn parse_timestamp(value: &str, lineno: usize) -> TabResult<DateTime<Utc>> {
    let v = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(v) {
        return Ok(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(v, fmt) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }
    if let Some(naive) = NaiveDate::parse_from_str(v, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return Ok(Utc.from_utc_datetime(&naive));
    }
    ParsingTimestampSnafu {
        value: value.to_string(),
        lineno,
    }
    .fail()
}

/// Converts a spreadsheet date serial (days since 1899-12-30) to a UTC
/// timestamp, rounded to the millisecond.
pub fn excel_serial_to_datetime(serial: f64) -> Option<DateTime<Utc>> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let millis = (serial * 86_400_000.0).round() as i64;
    let naive = epoch.checked_add_signed(Duration::milliseconds(millis))?;
    Some(Utc.from_utc_datetime(&naive))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps() {
        let expected: DateTime<Utc> = "2024-03-01T12:30:00Z".parse().unwrap();
        assert_eq!(parse_timestamp("2024-03-01T12:30:00Z", 1).unwrap(), expected);
        assert_eq!(
            parse_timestamp("2024-03-01T21:30:00+09:00", 1).unwrap(),
            expected
        );
        assert_eq!(parse_timestamp(" 2024-03-01 12:30:00 ", 1).unwrap(), expected);
        assert_eq!(
            parse_timestamp("2024-03-01", 1).unwrap(),
            "2024-03-01T00:00:00Z".parse::<DateTime<Utc>>().unwrap()
        );
        assert!(matches!(
            parse_timestamp("yesterday", 7),
            Err(TabError::ParsingTimestamp { lineno: 7, .. })
        ));
    }

    #[test]
    fn excel_serials() {
        assert_eq!(
            excel_serial_to_datetime(45292.5),
            Some("2024-01-01T12:00:00Z".parse().unwrap())
        );
        assert_eq!(excel_serial_to_datetime(-1.0), None);
    }

    #[test]
    fn file_names() {
        assert_eq!(simplify_file_name("data/lunch/answers.csv"), "answers.csv");
        assert_eq!(make_default_id("data/answers.xlsx", 12), "answers.xlsx-00000012");
        assert_eq!(infer_provider("a/b.csv"), "csv");
        assert_eq!(infer_provider("a/b.xlsx"), "xlsx");
        assert_eq!(infer_provider("a/b.json"), "json");
    }
}
