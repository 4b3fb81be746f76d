//! Match duration, liveness and day classification.

use chrono::{DateTime, Duration, Utc};

use crate::model::{NormalizedMatch, RawMatchRecord};
use crate::time::utc_day;

const INDOOR_FIELDS: [&str; 2] = ["Veld 1", "Veld 2"];
const INDOOR_PREFIX: &str = "Blaashal";

/// Prefix indoor hall fields so they are distinguishable from the outdoor pitches.
pub fn rewrite_field(record: &mut RawMatchRecord, indoor_venue: &str) {
    if record.venue() != indoor_venue {
        return;
    }
    if let Some(field) = record.field.as_mut() {
        if INDOOR_FIELDS.contains(&field.as_str()) {
            *field = format!("{} {}", INDOOR_PREFIX, field);
        }
    }
}

/// Playing time in minutes. First matching rule wins.
pub fn duration_minutes(
    category: Option<&str>,
    sub_category: Option<&str>,
    field: Option<&str>,
) -> i64 {
    if category == Some("Jongste jeugd") {
        return 50;
    }
    if let Some(sub) = sub_category {
        if sub.contains("Onder 12") || sub.contains("Onder 14") {
            return 70;
        }
        if sub == "Trimhockey" {
            return 60;
        }
    }
    if matches!(field, Some("Blaashal Veld 1") | Some("Blaashal Veld 2")) {
        return 50;
    }
    90
}

pub fn match_duration(record: &RawMatchRecord) -> Duration {
    Duration::minutes(duration_minutes(
        record.category.as_deref(),
        record.sub_category.as_deref(),
        record.field.as_deref(),
    ))
}

pub fn end_time(m: &NormalizedMatch) -> DateTime<Utc> {
    m.utc_date + match_duration(&m.record)
}

/// Still being played or yet to start.
pub fn is_active(m: &NormalizedMatch, now: DateTime<Utc>) -> bool {
    now < end_time(m)
}

/// Same UTC calendar day as `now`.
pub fn is_today(m: &NormalizedMatch, now: DateTime<Utc>) -> bool {
    utc_day(&m.utc_date) == utc_day(&now)
}
