use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Treat an explicit `null` like a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Location {
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
}

/// A fixture as published by the club site.
///
/// Attributes the feed does not interpret are kept in `extra` and passed
/// through to clients untouched.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct RawMatchRecord {
    #[serde(deserialize_with = "null_as_default")]
    pub date: String,
    pub time: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub home_team_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub away_team_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub location: Location,
    pub field: Option<String>,
    pub category: Option<String>,
    pub sub_category: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RawMatchRecord {
    pub fn venue(&self) -> &str {
        &self.location.name
    }

    pub fn teams(&self) -> [&str; 2] {
        [&self.home_team_name, &self.away_team_name]
    }
}

/// A record with a resolved start instant, ready for classification.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct NormalizedMatch {
    #[serde(flatten)]
    pub record: RawMatchRecord,
    #[serde(rename = "utcDate", with = "crate::time::iso_millis")]
    pub utc_date: DateTime<Utc>,
    #[serde(rename = "isOnViaplay")]
    pub is_on_broadcast: bool,
}

/// Cached outcome of one refresh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchesPayload {
    pub matches: Vec<NormalizedMatch>,
    pub is_today: bool,
}

/// Success body of `GET /api/matches`.
#[derive(Debug, Serialize)]
pub struct MatchesResponse<'a> {
    pub matches: &'a [NormalizedMatch],
    #[serde(rename = "isToday")]
    pub is_today: bool,
    #[serde(rename = "serverTime", with = "crate::time::iso_millis")]
    pub server_time: DateTime<Utc>,
}

/// Failure body of `GET /api/matches`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ErrorEnvelope {
    pub error: bool,
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    #[serde(rename = "statusMessage")]
    pub status_message: String,
    pub message: String,
}

impl ErrorEnvelope {
    pub fn server_error(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            error: true,
            status_code: 500,
            status_message: "Server Error".to_string(),
            message: if message.is_empty() {
                "Server Error".to_string()
            } else {
                message
            },
        }
    }
}
