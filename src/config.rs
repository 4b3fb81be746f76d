use std::env;
use std::time::Duration;

/// Request identity the club site expects on every call.
pub const USER_AGENT: &str = "Mozilla/5.0 (compatible; PinokeBot/1.0)";
pub const REFERER: &str = "https://www.pinoke.nl/";
pub const ACCEPT_LANGUAGE: &str = "nl-NL,nl;q=0.9,en;q=0.8";

/// Fixtures returned for the next match day when nothing is on today.
pub const MAX_NEXT_DAY_MATCHES: usize = 4;

/// Configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub upstream_base_url: String,
    pub catalog_collection: String,
    pub home_venues: Vec<String>,
    pub indoor_venue: String,
    /// Name searched for in broadcaster listings
    pub club_name: String,
    pub throttle: Duration,
    pub upstream_rate_per_minute: u32,
    pub cache_ttl: Duration,
    pub request_timeout: Duration,
    pub http_timeout: Duration,
    pub viaplay_enabled: bool,
    pub viaplay_url: String,
    /// If true, refresh once, print the payload and exit
    pub run_once: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            upstream_base_url: "https://www.pinoke.nl/_dm/s/rt/actions/sites/c07b0251".to_string(),
            catalog_collection: "Toekomstige_wedstrijden".to_string(),
            home_venues: vec![
                "Amsterdamse Bos (Pinoké)".to_string(),
                "Pinoké Blaashal".to_string(),
            ],
            indoor_venue: "Pinoké Blaashal".to_string(),
            club_name: "Pinoké".to_string(),
            throttle: Duration::from_millis(100),
            upstream_rate_per_minute: 60,
            cache_ttl: Duration::from_secs(30 * 60),
            request_timeout: Duration::from_secs(60),
            http_timeout: Duration::from_secs(15),
            viaplay_enabled: false,
            viaplay_url: "https://content.viaplay.nl/pcdash-nl/sport/hockey".to_string(),
            run_once: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset or unparseable values keep their default.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let number = |key: &str, fallback: u64| {
            get(key)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .unwrap_or(fallback)
        };
        let flag = |key: &str| {
            get(key)
                .map(|v| v.trim().to_lowercase() == "true")
                .unwrap_or(false)
        };

        let home_venues = get("HOME_VENUES")
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|venues| !venues.is_empty())
            .unwrap_or(defaults.home_venues);

        Self {
            port: get("PORT")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.port),
            upstream_base_url: get("UPSTREAM_BASE_URL")
                .map(|v| v.trim().trim_end_matches('/').to_string())
                .unwrap_or(defaults.upstream_base_url),
            catalog_collection: get("CATALOG_COLLECTION").unwrap_or(defaults.catalog_collection),
            home_venues,
            indoor_venue: get("INDOOR_VENUE").unwrap_or(defaults.indoor_venue),
            club_name: get("CLUB_NAME").unwrap_or(defaults.club_name),
            throttle: Duration::from_millis(number("THROTTLE_MS", 100)),
            upstream_rate_per_minute: get("UPSTREAM_RATE_PER_MINUTE")
                .and_then(|v| v.trim().parse().ok())
                .filter(|&n: &u32| n > 0)
                .unwrap_or(defaults.upstream_rate_per_minute),
            cache_ttl: Duration::from_secs(number("CACHE_TTL_SECONDS", 30 * 60)),
            request_timeout: Duration::from_secs(number("REQUEST_TIMEOUT_SECONDS", 60)),
            http_timeout: Duration::from_secs(number("HTTP_TIMEOUT_SECONDS", 15)),
            viaplay_enabled: flag("VIAPLAY_ENABLED"),
            viaplay_url: get("VIAPLAY_URL").unwrap_or(defaults.viaplay_url),
            run_once: flag("RUN_ONCE"),
        }
    }
}
