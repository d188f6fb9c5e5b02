//! Calendar dates as the backend writes them (`YYYY-MM-DD`).
//!
//! Dates are parsed field by field into a `NaiveDate`, never through an
//! instant, so no timezone can move a settlement period by a day.

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Deserializer, Serializer};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid calendar date '{0}', expected YYYY-MM-DD")]
pub struct DateParseError(pub String);

/// Parse `YYYY-MM-DD`. A trailing time part (`2024-03-04T10:20:00Z`) is
/// ignored.
pub fn parse_calendar_date(raw: &str) -> Result<NaiveDate, DateParseError> {
    let invalid = || DateParseError(raw.to_string());

    let date_part = raw
        .trim()
        .split(['T', ' '])
        .next()
        .ok_or_else(invalid)?;

    let mut parts = date_part.split('-');
    let (Some(year), Some(month), Some(day), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(invalid());
    };

    let year: i32 = year.parse().map_err(|_| invalid())?;
    let month: u32 = month.parse().map_err(|_| invalid())?;
    let day: u32 = day.parse().map_err(|_| invalid())?;

    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)
}

/// `dd/mm/yyyy`
pub fn format_short_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// `dd-mm-yyyy`, safe inside file names.
pub fn format_file_date(date: NaiveDate) -> String {
    date.format("%d-%m-%Y").to_string()
}

/// Best-effort display of a raw backend date; unparseable input is shown as is.
pub fn display_raw_date(raw: &str) -> String {
    parse_calendar_date(raw)
        .map(format_short_date)
        .unwrap_or_else(|_| raw.to_string())
}

/// Monday and Sunday of the week containing `today`.
pub fn week_bounds(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let offset = u64::from(today.weekday().num_days_from_monday());
    let monday = today.checked_sub_days(Days::new(offset)).unwrap_or(today);
    let sunday = monday.checked_add_days(Days::new(6)).unwrap_or(monday);
    (monday, sunday)
}

/// Serde adapter for `YYYY-MM-DD` fields.
pub mod calendar_date {
    use super::*;

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&date.format("%Y-%m-%d").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_calendar_date(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_plain_and_timestamped_dates() {
        assert_eq!(parse_calendar_date("2024-03-04"), Ok(ymd(2024, 3, 4)));
        assert_eq!(parse_calendar_date("2024-03-04T23:59:59-05:00"), Ok(ymd(2024, 3, 4)));
        assert_eq!(parse_calendar_date("2024-03-04 08:00:00"), Ok(ymd(2024, 3, 4)));
    }

    #[test]
    fn rejects_malformed_dates() {
        for raw in ["", "2024-03", "2024-13-01", "2024-02-30", "04/03/2024", "2024-03-04-01"] {
            assert!(parse_calendar_date(raw).is_err(), "{raw} should fail");
        }
    }

    #[test]
    fn short_date_is_day_first() {
        assert_eq!(format_short_date(ymd(2024, 3, 4)), "04/03/2024");
        assert_eq!(format_file_date(ymd(2024, 3, 4)), "04-03-2024");
        assert_eq!(display_raw_date("2024-01-09"), "09/01/2024");
        assert_eq!(display_raw_date("soon"), "soon");
    }

    #[test]
    fn week_runs_monday_to_sunday() {
        // 2024-03-06 is a Wednesday.
        assert_eq!(week_bounds(ymd(2024, 3, 6)), (ymd(2024, 3, 4), ymd(2024, 3, 10)));
        assert_eq!(week_bounds(ymd(2024, 3, 4)), (ymd(2024, 3, 4), ymd(2024, 3, 10)));
        // Sunday belongs to the week that started six days earlier.
        assert_eq!(week_bounds(ymd(2024, 3, 10)), (ymd(2024, 3, 4), ymd(2024, 3, 10)));
    }
}
