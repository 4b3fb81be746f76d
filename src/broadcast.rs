//! Broadcaster schedule lookup for first-team fixtures.
//!
//! When enabled, the broadcaster's listing for each candidate date is fetched
//! once per refresh. A fixture counts as broadcast when a listed programme on
//! the same venue-local date, for the same team gender, mentions the club.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use tracing::{info, warn};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::error::Result;
use crate::model::RawMatchRecord;
use crate::time::{parse_civil_date, venue_date};
use crate::upstream::UpstreamLimiter;

const CURRENT_BLOCK_TITLE: &str = "Huidige uitzendingen";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gender {
    Heren,
    Dames,
}

impl Gender {
    /// Gender of a first-team fixture, `None` for every other fixture.
    pub fn of_first_team(record: &RawMatchRecord) -> Option<Self> {
        record.teams().iter().find_map(|team| {
            if team.contains("Heren 01") {
                Some(Gender::Heren)
            } else if team.contains("Dames 01") {
                Some(Gender::Dames)
            } else {
                None
            }
        })
    }

    fn mentioned_in(folded: &str) -> Option<Self> {
        if folded.contains("dames") {
            Some(Gender::Dames)
        } else if folded.contains("heren") {
            Some(Gender::Heren)
        } else {
            None
        }
    }
}

/// Lowercase and strip diacritics so "Pinoké" and "Pinoke" compare equal.
pub fn fold(text: &str) -> String {
    text.nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct PageResponse {
    #[serde(rename = "_embedded")]
    embedded: PageEmbedded,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct PageEmbedded {
    #[serde(rename = "viaplay:blocks")]
    blocks: Vec<Block>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct Block {
    title: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(rename = "_embedded")]
    embedded: BlockEmbedded,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct BlockEmbedded {
    #[serde(rename = "viaplay:products")]
    products: Vec<Product>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct Product {
    content: ProductContent,
    epg: Epg,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ProductContent {
    title: Option<String>,
    #[serde(rename = "originalTitle")]
    original_title: Option<String>,
    synopsis: Option<String>,
    description: Description,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct Description {
    editorial: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct Epg {
    start: Option<DateTime<Utc>>,
}

/// One listed programme, reduced to what matching needs.
#[derive(Debug, Clone, PartialEq)]
pub struct Programme {
    pub date: NaiveDate,
    pub gender: Option<Gender>,
    /// Folded title and synopsis text.
    pub text: String,
}

impl Programme {
    fn from_product(product: Product) -> Option<Self> {
        let date = venue_date(&product.epg.start?);
        let c = product.content;
        let parts: Vec<String> = [c.title, c.original_title, c.synopsis, c.description.editorial]
            .into_iter()
            .flatten()
            .map(|s| fold(&s))
            .collect();
        let gender = parts.iter().find_map(|p| Gender::mentioned_in(p));
        Some(Self {
            date,
            gender,
            text: parts.join(" "),
        })
    }
}

/// Programmes known for this refresh. An empty schedule matches nothing.
#[derive(Debug, Clone, Default)]
pub struct BroadcastSchedule {
    club: String,
    programmes: Vec<Programme>,
}

impl BroadcastSchedule {
    pub fn new(club_name: &str, programmes: Vec<Programme>) -> Self {
        Self {
            club: fold(club_name),
            programmes,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.programmes.is_empty()
    }

    /// Whether a first-team fixture appears in the listing.
    pub fn covers(&self, record: &RawMatchRecord) -> bool {
        if self.programmes.is_empty() || self.club.is_empty() {
            return false;
        }
        let Some(gender) = Gender::of_first_team(record) else {
            return false;
        };
        let Some(date) = parse_civil_date(&record.date) else {
            return false;
        };
        self.programmes.iter().any(|p| {
            p.date == date && p.gender == Some(gender) && p.text.contains(&self.club)
        })
    }
}

pub struct ViaplayClient {
    http_client: reqwest::Client,
    url: String,
    club_name: String,
    rate_limiter: Arc<UpstreamLimiter>,
    throttle: Duration,
}

impl ViaplayClient {
    pub fn new(
        http_client: reqwest::Client,
        url: impl Into<String>,
        club_name: impl Into<String>,
        rate_limiter: Arc<UpstreamLimiter>,
        throttle: Duration,
    ) -> Self {
        Self {
            http_client,
            url: url.into(),
            club_name: club_name.into(),
            rate_limiter,
            throttle,
        }
    }

    /// One day's listing. Paced like the collection fetches and drawn from
    /// the same request budget.
    async fn fetch_day(&self, date: NaiveDate) -> Result<Vec<Programme>> {
        tokio::time::sleep(self.throttle).await;
        self.rate_limiter.until_ready().await;

        let day = date.format("%Y-%m-%d").to_string();
        let page: PageResponse = self
            .http_client
            .get(&self.url)
            .query(&[("date", day.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(page
            .embedded
            .blocks
            .into_iter()
            .filter(|b| {
                b.title.as_deref() == Some(CURRENT_BLOCK_TITLE) && b.kind.as_deref() == Some("list")
            })
            .flat_map(|b| b.embedded.products)
            .filter_map(Programme::from_product)
            .collect())
    }

    async fn fetch_schedule(&self, dates: &BTreeSet<NaiveDate>) -> Result<BroadcastSchedule> {
        let mut programmes = Vec::new();
        for date in dates {
            programmes.extend(self.fetch_day(*date).await?);
        }
        info!(
            "Broadcaster lists {} programmes over {} dates",
            programmes.len(),
            dates.len()
        );
        Ok(BroadcastSchedule::new(&self.club_name, programmes))
    }
}

/// Broadcast lookup, present only when the feature is switched on.
pub enum Broadcaster {
    Disabled,
    Viaplay(ViaplayClient),
}

impl Broadcaster {
    /// Schedule covering the first-team fixtures among `candidates`.
    ///
    /// Never fails: a broadcaster error is logged and yields an empty schedule.
    pub async fn schedule_for<'a, I>(&self, candidates: I) -> BroadcastSchedule
    where
        I: IntoIterator<Item = &'a RawMatchRecord>,
    {
        let Broadcaster::Viaplay(client) = self else {
            return BroadcastSchedule::default();
        };

        let dates: BTreeSet<NaiveDate> = candidates
            .into_iter()
            .filter(|r| Gender::of_first_team(r).is_some())
            .filter_map(|r| parse_civil_date(&r.date))
            .collect();
        if dates.is_empty() {
            return BroadcastSchedule::default();
        }

        match client.fetch_schedule(&dates).await {
            Ok(schedule) => schedule,
            Err(e) => {
                warn!("Broadcaster fetch failed, skipping broadcast matching: {}", e);
                BroadcastSchedule::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Location;

    fn first_team(home: &str, away: &str, date: &str) -> RawMatchRecord {
        RawMatchRecord {
            date: date.to_string(),
            time: Some("14:45".to_string()),
            home_team_name: home.to_string(),
            away_team_name: away.to_string(),
            location: Location {
                name: "Sportpark De Klapperboom".to_string(),
            },
            ..Default::default()
        }
    }

    fn heren_derby(date: &str) -> RawMatchRecord {
        first_team("Kampong Heren 01", "Pinoké Heren 01", date)
    }

    fn programme(date: (i32, u32, u32), text: &str) -> Programme {
        let folded = fold(text);
        Programme {
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            gender: Gender::mentioned_in(&folded),
            text: folded,
        }
    }

    #[test]
    fn folding_strips_accents_and_case() {
        assert_eq!(fold("Pinoké"), "pinoke");
        assert_eq!(fold("PINOKE"), "pinoke");
        assert_eq!(fold("Héren 01"), "heren 01");
    }

    #[test]
    fn first_team_gender_from_either_side() {
        assert_eq!(
            Gender::of_first_team(&heren_derby("01-01-2025")),
            Some(Gender::Heren)
        );
        assert_eq!(
            Gender::of_first_team(&first_team("HDM", "Pinoké Dames 01", "01-01-2025")),
            Some(Gender::Dames)
        );
        assert_eq!(
            Gender::of_first_team(&first_team("Pinoké Heren 02", "HDM Heren 02", "01-01-2025")),
            None
        );
    }

    #[test]
    fn programme_must_match_date_gender_and_club() {
        let schedule = BroadcastSchedule::new(
            "Pinoké",
            vec![
                programme((2025, 3, 9), "Hoofdklasse Heren: Kampong - Pinoke"),
                programme((2025, 3, 16), "Hoofdklasse Dames: Pinoké - HDM"),
            ],
        );

        assert!(schedule.covers(&heren_derby("09-03-2025")));
        let dames = first_team("Kampong Dames 01", "Pinoké Dames 01", "09-03-2025");
        assert!(!schedule.covers(&dames));
        assert!(!schedule.covers(&heren_derby("16-03-2025")));
        assert!(schedule.covers(&first_team("Pinoké Dames 01", "HDM Dames 01", "16-03-2025")));
    }

    #[test]
    fn other_clubs_programmes_do_not_match() {
        let schedule = BroadcastSchedule::new(
            "Pinoké",
            vec![programme((2025, 3, 9), "Hoofdklasse Heren: Kampong - Bloemendaal")],
        );
        assert!(!schedule.covers(&heren_derby("09-03-2025")));
    }

    #[test]
    fn empty_schedule_matches_nothing() {
        let schedule = BroadcastSchedule::default();
        assert!(schedule.is_empty());
        assert!(!schedule.covers(&heren_derby("09-03-2025")));
    }

    #[test]
    fn product_date_is_taken_in_venue_time() {
        let product: Product = serde_json::from_value(serde_json::json!({
            "content": {
                "title": "Hockey Heren",
                "synopsis": "Kampong - Pinoké",
                "description": { "editorial": "Live" }
            },
            "epg": { "start": "2025-03-08T23:30:00Z" }
        }))
        .unwrap();
        let programme = Programme::from_product(product).unwrap();
        assert_eq!(programme.date, NaiveDate::from_ymd_opt(2025, 3, 9).unwrap());
        assert_eq!(programme.gender, Some(Gender::Heren));
        assert!(programme.text.contains("pinoke"));
    }

    #[tokio::test]
    async fn disabled_broadcaster_yields_empty_schedule() {
        let candidates = vec![heren_derby("09-03-2025")];
        let schedule = Broadcaster::Disabled.schedule_for(&candidates).await;
        assert!(!schedule.covers(&candidates[0]));
        assert!(schedule.is_empty());
    }

    #[tokio::test]
    async fn listing_requests_draw_from_the_shared_budget() {
        let mut server = mockito::Server::new_async().await;
        let listing = server
            .mock("GET", "/viaplay")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body("{}")
            .expect(2)
            .create_async()
            .await;

        let limiter = crate::upstream::rate_limiter(2);
        let client = ViaplayClient::new(
            crate::upstream::build_http_client(Duration::from_secs(5)).unwrap(),
            format!("{}/viaplay", server.url()),
            "Pinoké",
            limiter.clone(),
            Duration::ZERO,
        );
        let candidates = vec![heren_derby("09-03-2025"), heren_derby("16-03-2025")];

        let schedule = Broadcaster::Viaplay(client).schedule_for(&candidates).await;

        listing.assert_async().await;
        assert!(schedule.is_empty());
        assert!(limiter.check().is_err());
    }
}
