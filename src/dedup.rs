use std::collections::HashSet;

use crate::model::RawMatchRecord;

/// Natural key of a fixture across overlapping collections.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DedupKey {
    pub date: String,
    pub time: Option<String>,
    pub home_team: String,
    pub away_team: String,
    pub venue: String,
    pub field: Option<String>,
}

impl DedupKey {
    pub fn of(record: &RawMatchRecord) -> Self {
        Self {
            date: record.date.clone(),
            time: record.time.clone(),
            home_team: record.home_team_name.clone(),
            away_team: record.away_team_name.clone(),
            venue: record.venue().to_string(),
            field: record.field.clone(),
        }
    }
}

/// Flatten batches in fetch order and keep the first record seen per key.
pub fn deduplicate<I>(batches: I) -> Vec<RawMatchRecord>
where
    I: IntoIterator,
    I::Item: IntoIterator<Item = RawMatchRecord>,
{
    let mut seen = HashSet::new();
    batches
        .into_iter()
        .flatten()
        .filter(|record| seen.insert(DedupKey::of(record)))
        .collect()
}
