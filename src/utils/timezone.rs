//! Display formatting in the campus timezone
//!
//! All session times are rendered in America/New_York regardless of where
//! the viewer or the server is located.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::{America::New_York, Tz};

use crate::utils::errors::{Result, StudyGroupsError};

pub const CAMPUS_TIMEZONE: Tz = New_York;

/// Parse an RFC 3339 timestamp such as `2026-01-20T14:00:00-05:00`
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StudyGroupsError::Validation(format!("Invalid timestamp '{}': {}", value, e)))
}

/// "Friday, January 17, 2026"
pub fn format_date(at: DateTime<Utc>) -> String {
    at.with_timezone(&CAMPUS_TIMEZONE).format("%A, %B %-d, %Y").to_string()
}

/// "3:00 PM"
pub fn format_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&CAMPUS_TIMEZONE).format("%-I:%M %p").to_string()
}

/// "3:00 PM – 5:00 PM"
pub fn format_time_range(start: DateTime<Utc>, end: DateTime<Utc>) -> String {
    format!("{} – {}", format_time(start), format_time(end))
}

/// "Jan 17"
pub fn format_short_date(at: DateTime<Utc>) -> String {
    at.with_timezone(&CAMPUS_TIMEZONE).format("%b %-d").to_string()
}

fn campus_date(at: DateTime<Utc>) -> NaiveDate {
    at.with_timezone(&CAMPUS_TIMEZONE).date_naive()
}

pub fn is_today(at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    campus_date(at) == campus_date(now)
}

/// "Today", "Tomorrow", or "Friday, Jan 17" relative to `now`
pub fn relative_day(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let day = campus_date(at);
    let today = campus_date(now);

    if day == today {
        "Today".to_string()
    } else if Some(day) == today.succ_opt() {
        "Tomorrow".to_string()
    } else {
        at.with_timezone(&CAMPUS_TIMEZONE).format("%A, %b %-d").to_string()
    }
}

/// Combine a campus calendar date and wall-clock time into a UTC instant.
///
/// Ambiguous local times (DST fall-back) resolve to the earlier instant;
/// nonexistent ones (spring-forward gap) are rejected.
pub fn campus_datetime(date: NaiveDate, time: NaiveTime) -> Result<DateTime<Utc>> {
    CAMPUS_TIMEZONE
        .from_local_datetime(&date.and_time(time))
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| {
            StudyGroupsError::Validation(format!(
                "{} {} does not exist in Eastern Time",
                date,
                time.format("%H:%M")
            ))
        })
}

/// Default expiry for a group: the sooner of 24 hours after creation and its end time
pub fn default_expiry(created_at: DateTime<Utc>, end_time: DateTime<Utc>) -> DateTime<Utc> {
    std::cmp::min(created_at + Duration::hours(24), end_time)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(value: &str) -> DateTime<Utc> {
        parse_timestamp(value).unwrap()
    }

    #[test]
    fn test_format_time_range_in_eastern_time() {
        let start = ts("2026-01-20T14:00:00-05:00");
        let end = ts("2026-01-20T16:00:00-05:00");
        assert_eq!(format_time_range(start, end), "2:00 PM – 4:00 PM");
    }

    #[test]
    fn test_format_ignores_source_offset() {
        // 19:00 UTC is 2 PM in New York in January
        assert_eq!(format_time(ts("2026-01-20T19:00:00Z")), "2:00 PM");
        assert_eq!(format_time(ts("2026-07-20T19:00:00Z")), "3:00 PM");
    }

    #[test]
    fn test_format_date_and_short_date() {
        let at = ts("2026-01-17T15:00:00-05:00");
        assert_eq!(format_date(at), "Saturday, January 17, 2026");
        assert_eq!(format_short_date(at), "Jan 17");
    }

    #[test]
    fn test_relative_day() {
        let now = ts("2026-01-20T10:00:00-05:00");
        assert_eq!(relative_day(ts("2026-01-20T22:30:00-05:00"), now), "Today");
        assert_eq!(relative_day(ts("2026-01-21T09:00:00-05:00"), now), "Tomorrow");
        assert_eq!(relative_day(ts("2026-01-23T09:00:00-05:00"), now), "Friday, Jan 23");
    }

    #[test]
    fn test_relative_day_uses_eastern_calendar() {
        // 02:00 UTC on the 21st is still the evening of the 20th in New York
        let now = ts("2026-01-20T12:00:00-05:00");
        assert_eq!(relative_day(ts("2026-01-21T02:00:00Z"), now), "Today");
        assert!(is_today(ts("2026-01-21T02:00:00Z"), now));
        assert!(!is_today(ts("2026-01-21T06:00:00Z"), now));
    }

    #[test]
    fn test_campus_datetime() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 20).unwrap();
        let time = NaiveTime::from_hms_opt(14, 0, 0).unwrap();
        assert_eq!(campus_datetime(date, time).unwrap(), ts("2026-01-20T19:00:00Z"));

        let gap_date = NaiveDate::from_ymd_opt(2026, 3, 8).unwrap();
        let gap_time = NaiveTime::from_hms_opt(2, 30, 0).unwrap();
        assert!(campus_datetime(gap_date, gap_time).is_err());
    }

    #[test]
    fn test_default_expiry() {
        let created = ts("2026-01-20T10:00:00Z");
        assert_eq!(default_expiry(created, ts("2026-01-20T12:00:00Z")), ts("2026-01-20T12:00:00Z"));
        assert_eq!(default_expiry(created, ts("2026-01-23T12:00:00Z")), ts("2026-01-21T10:00:00Z"));
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert!(parse_timestamp("tomorrow at noon").is_err());
    }
}
