//! Venue civil time <-> UTC conversion.
//!
//! Fixtures are published as a `dd-mm-yyyy` date plus an optional `HH:mm`
//! wall-clock time in Amsterdam. Everything downstream works on UTC instants,
//! and day comparisons are done on the `YYYY-MM-DD` prefix of the UTC instant.

use chrono::{
    DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, TimeZone,
    Utc,
};
use chrono_tz::Europe::Amsterdam;
use chrono_tz::Tz;

pub const VENUE_TZ: Tz = Amsterdam;

/// Parse a `dd-mm-yyyy` civil date.
pub fn parse_civil_date(date: &str) -> Option<NaiveDate> {
    let date = date.trim();
    if date.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(date, "%d-%m-%Y").ok()
}

fn parse_civil_time(time: Option<&str>) -> Option<NaiveTime> {
    match time.map(str::trim) {
        None | Some("") => NaiveTime::from_hms_opt(0, 0, 0),
        Some(t) => NaiveTime::parse_from_str(t, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(t, "%H:%M:%S"))
            .ok(),
    }
}

/// Convert a venue-local date and time to a UTC instant.
///
/// Missing time means midnight. Returns `None` when either part does not parse.
/// The offset is the one in effect at that local wall-clock moment, so a
/// summer date gets CEST even if the UTC date would differ.
pub fn local_to_utc(date: &str, time: Option<&str>) -> Option<DateTime<Utc>> {
    let naive = parse_civil_date(date)?.and_time(parse_civil_time(time)?);
    resolve_local(naive).map(|dt| dt.with_timezone(&Utc))
}

fn resolve_local(naive: NaiveDateTime) -> Option<DateTime<Tz>> {
    match VENUE_TZ.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Some(dt),
        LocalResult::Ambiguous(earliest, _) => Some(earliest),
        // Spring-forward gap: the wall clock skips an hour, move past it.
        LocalResult::None => VENUE_TZ
            .from_local_datetime(&(naive + Duration::hours(1)))
            .earliest(),
    }
}

/// `YYYY-MM-DD` of an instant, taken in UTC.
pub fn utc_day(instant: &DateTime<Utc>) -> String {
    instant.format("%Y-%m-%d").to_string()
}

/// Venue-local calendar date of an instant.
pub fn venue_date(instant: &DateTime<Utc>) -> NaiveDate {
    instant.with_timezone(&VENUE_TZ).date_naive()
}

/// RFC 3339 with millisecond precision and a `Z` suffix.
pub fn to_iso(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub mod iso_millis {
    use chrono::{DateTime, Utc};
    use serde::Serializer;

    pub fn serialize<S: Serializer>(instant: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::to_iso(instant))
    }
}
