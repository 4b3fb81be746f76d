#![allow(dead_code)]

use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use matchday_feed::{Clock, Config};
use serde_json::{json, Value};

pub const CATALOG_PATH: &str = "/collections/Toekomstige_wedstrijden/";
pub const HOME: &str = "Amsterdamse Bos (Pinoké)";
pub const HALL: &str = "Pinoké Blaashal";

/// Saturday 21-09-2024, 12:00 in Amsterdam.
pub fn saturday_noon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 9, 21, 10, 0, 0).unwrap()
}

/// Clock the tests move by hand.
pub struct ManualClock(Mutex<DateTime<Utc>>);

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self(Mutex::new(start))
    }

    pub fn advance(&self, by: chrono::Duration) {
        *self.0.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

pub fn config(base_url: &str) -> Config {
    Config {
        upstream_base_url: base_url.to_string(),
        throttle: Duration::ZERO,
        upstream_rate_per_minute: 6000,
        http_timeout: Duration::from_secs(5),
        ..Config::default()
    }
}

pub fn collection_path(name: &str) -> String {
    format!("/collections/{}/", name)
}

pub fn fixture(date: &str, time: &str, home: &str, away: &str, venue: &str) -> Value {
    json!({
        "date": date,
        "time": time,
        "home_team_name": home,
        "away_team_name": away,
        "location": { "name": venue },
        "field": "Veld 1",
        "category": "Senioren",
        "sub_category": null
    })
}

pub fn collection_body(records: &[Value]) -> String {
    let items: Vec<Value> = records.iter().map(|r| json!({ "data": r })).collect();
    json!({ "value": serde_json::to_string(&items).unwrap() }).to_string()
}

pub fn catalog_body(names: &[&str]) -> String {
    let items: Vec<Value> = names
        .iter()
        .map(|n| json!({ "data": { "collectionname": n } }))
        .collect();
    json!({ "value": serde_json::to_string(&items).unwrap() }).to_string()
}

pub async fn mock_catalog(server: &mut mockito::ServerGuard, names: &[&str]) -> mockito::Mock {
    server
        .mock("GET", CATALOG_PATH)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(catalog_body(names))
        .create_async()
        .await
}

pub async fn mock_collection(
    server: &mut mockito::ServerGuard,
    name: &str,
    records: &[Value],
) -> mockito::Mock {
    server
        .mock("GET", collection_path(name).as_str())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(collection_body(records))
        .create_async()
        .await
}
