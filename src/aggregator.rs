//! Refresh pipeline: catalog, collection scan, dedup, normalization,
//! broadcast correlation and the today / next-match-day selection.

use tracing::{debug, info};

use chrono::{DateTime, Utc};

use crate::broadcast::{Broadcaster, Gender, ViaplayClient};
use crate::classify::{is_active, is_today, rewrite_field};
use crate::config::{Config, MAX_NEXT_DAY_MATCHES};
use crate::dedup::deduplicate;
use crate::error::Result;
use crate::model::{MatchesPayload, NormalizedMatch, RawMatchRecord};
use crate::time::{local_to_utc, utc_day};
use crate::upstream::{build_http_client, rate_limiter, CollectionScan, CollectionsClient};

/// Keys the feed sets itself; upstream copies would shadow them.
const DERIVED_KEYS: [&str; 2] = ["utcDate", "isOnViaplay"];

pub struct Aggregator {
    collections: CollectionsClient,
    broadcaster: Broadcaster,
    home_venues: Vec<String>,
    indoor_venue: String,
}

impl Aggregator {
    pub fn new(
        collections: CollectionsClient,
        broadcaster: Broadcaster,
        home_venues: Vec<String>,
        indoor_venue: String,
    ) -> Self {
        Self {
            collections,
            broadcaster,
            home_venues,
            indoor_venue,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let http_client = build_http_client(config.http_timeout)?;
        let limiter = rate_limiter(config.upstream_rate_per_minute);
        let broadcaster = if config.viaplay_enabled {
            Broadcaster::Viaplay(ViaplayClient::new(
                http_client.clone(),
                config.viaplay_url.clone(),
                config.club_name.clone(),
                limiter.clone(),
                config.throttle,
            ))
        } else {
            Broadcaster::Disabled
        };

        Ok(Self::new(
            CollectionsClient::new(config, http_client, limiter),
            broadcaster,
            config.home_venues.clone(),
            config.indoor_venue.clone(),
        ))
    }

    fn is_home(&self, record: &RawMatchRecord) -> bool {
        self.home_venues.iter().any(|v| v == record.venue())
    }

    /// A home fixture dated today or later (UTC day).
    fn is_upcoming_home(&self, record: &RawMatchRecord, today: &str) -> bool {
        self.is_home(record)
            && local_to_utc(&record.date, record.time.as_deref())
                .is_some_and(|instant| utc_day(&instant).as_str() >= today)
    }

    fn normalize(&self, mut record: RawMatchRecord) -> Option<NormalizedMatch> {
        let Some(utc_date) = local_to_utc(&record.date, record.time.as_deref()) else {
            debug!(
                "Dropping fixture with unparseable date/time {:?} {:?}",
                record.date, record.time
            );
            return None;
        };
        rewrite_field(&mut record, &self.indoor_venue);
        for key in DERIVED_KEYS {
            record.extra.remove(key);
        }
        Some(NormalizedMatch {
            record,
            utc_date,
            is_on_broadcast: false,
        })
    }

    /// Run the full pipeline against the upstream.
    ///
    /// Only a catalog failure is fatal. Collections are scanned newest first
    /// and the scan stops at the first collection holding an upcoming home
    /// fixture; this relies on the catalog being ordered by recency.
    pub async fn run(&self, now: DateTime<Utc>) -> Result<MatchesPayload> {
        let today = utc_day(&now);

        let names = self.collections.fetch_catalog().await?;
        let batches = CollectionScan::new(&self.collections, names)
            .collect_until(|records| records.iter().any(|r| self.is_upcoming_home(r, &today)))
            .await;

        let fetched: usize = batches.iter().map(Vec::len).sum();
        let records = deduplicate(batches);
        debug!("{} records after dedup ({} fetched)", records.len(), fetched);

        let upcoming: Vec<NormalizedMatch> = records
            .into_iter()
            .filter(|r| self.is_home(r) || Gender::of_first_team(r).is_some())
            .filter_map(|r| self.normalize(r))
            .filter(|m| utc_day(&m.utc_date) >= today)
            .collect();

        let schedule = self
            .broadcaster
            .schedule_for(upcoming.iter().map(|m| &m.record))
            .await;

        let fixtures: Vec<NormalizedMatch> = upcoming
            .into_iter()
            .filter_map(|mut m| {
                m.is_on_broadcast = schedule.covers(&m.record);
                (self.is_home(&m.record) || m.is_on_broadcast).then_some(m)
            })
            .collect();

        let payload = select(fixtures, now);
        info!(
            "Selected {} fixtures (today: {})",
            payload.matches.len(),
            payload.is_today
        );
        Ok(payload)
    }
}

/// Today's fixtures that have not ended yet or, failing that, the fixtures of
/// the nearest later day, capped at [`MAX_NEXT_DAY_MATCHES`].
///
/// A today-dated fixture that has already ended is dropped and never counts
/// towards the next-day fallback.
pub fn select(mut fixtures: Vec<NormalizedMatch>, now: DateTime<Utc>) -> MatchesPayload {
    fixtures.sort_by_key(|m| m.utc_date);
    let today = utc_day(&now);

    let todays: Vec<NormalizedMatch> = fixtures
        .iter()
        .filter(|m| is_today(m, now) && is_active(m, now))
        .cloned()
        .collect();
    if !todays.is_empty() {
        return MatchesPayload {
            matches: todays,
            is_today: true,
        };
    }

    let Some(next_day) = fixtures
        .iter()
        .map(|m| utc_day(&m.utc_date))
        .find(|day| *day > today)
    else {
        return MatchesPayload::default();
    };

    MatchesPayload {
        matches: fixtures
            .into_iter()
            .filter(|m| utc_day(&m.utc_date) == next_day)
            .take(MAX_NEXT_DAY_MATCHES)
            .collect(),
        is_today: false,
    }
}
