//! Club-site collections API.
//!
//! Every payload is wrapped as `{ "value": "<JSON-encoded array>" }`. The
//! catalog collection lists the other collections, newest first; each of
//! those holds `{ "data": RawMatchRecord }` elements.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE, REFERER};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::{self, Config};
use crate::error::{FeedError, Result};
use crate::model::RawMatchRecord;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct Envelope {
    value: Option<String>,
}

impl Envelope {
    fn items(&self) -> Result<Vec<Value>> {
        let raw = self.value.as_deref().unwrap_or("[]");
        Ok(serde_json::from_str(raw)?)
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct CatalogEntry {
    collectionname: Option<String>,
    data: Option<Box<CatalogEntry>>,
}

impl CatalogEntry {
    fn into_name(self) -> Option<String> {
        self.data
            .and_then(|inner| inner.into_name())
            .or(self.collectionname)
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct RecordEnvelope {
    data: Option<RawMatchRecord>,
}

/// Process-wide upstream request budget, shared by every outbound client.
pub type UpstreamLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

pub fn rate_limiter(per_minute: u32) -> Arc<UpstreamLimiter> {
    let per_minute = NonZeroU32::new(per_minute).unwrap_or(NonZeroU32::MIN);
    Arc::new(RateLimiter::direct(Quota::per_minute(per_minute)))
}

/// Build the HTTP client with the fixed request identity as default headers.
pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    headers.insert(REFERER, HeaderValue::from_static(config::REFERER));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(config::ACCEPT_LANGUAGE));

    let client = reqwest::Client::builder()
        .user_agent(config::USER_AGENT)
        .default_headers(headers)
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .pool_max_idle_per_host(5)
        .build()?;
    Ok(client)
}

/// Client for the catalog and per-collection fixture lists.
pub struct CollectionsClient {
    http_client: reqwest::Client,
    base_url: String,
    catalog_collection: String,
    throttle: Duration,
    rate_limiter: Arc<UpstreamLimiter>,
}

impl CollectionsClient {
    pub fn new(
        config: &Config,
        http_client: reqwest::Client,
        rate_limiter: Arc<UpstreamLimiter>,
    ) -> Self {
        Self {
            http_client,
            base_url: config.upstream_base_url.trim_end_matches('/').to_string(),
            catalog_collection: config.catalog_collection.clone(),
            throttle: config.throttle,
            rate_limiter,
        }
    }

    fn collection_url(&self, name: &str) -> String {
        format!("{}/collections/{}/", self.base_url, name)
    }

    /// Fetch the ordered list of collection names.
    ///
    /// Any failure here is fatal for the refresh: without a catalog there is
    /// nothing to scan.
    pub async fn fetch_catalog(&self) -> Result<Vec<String>> {
        self.rate_limiter.until_ready().await;

        let url = self.collection_url(&self.catalog_collection);
        let response = self.http_client.get(&url).send().await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(FeedError::Catalog { status, body });
        }

        let envelope: Envelope = serde_json::from_str(&body)?;
        let names: Vec<String> = envelope
            .items()?
            .into_iter()
            .filter_map(|item| serde_json::from_value::<CatalogEntry>(item).ok())
            .filter_map(CatalogEntry::into_name)
            .collect();

        info!("Catalog lists {} collections", names.len());
        Ok(names)
    }

    /// Fetch one collection's records.
    ///
    /// Waits the fixed throttle delay first. Failures are logged and yield an
    /// empty list so the scan can continue with the next collection.
    pub async fn fetch_collection(&self, name: &str) -> Vec<RawMatchRecord> {
        tokio::time::sleep(self.throttle).await;
        self.rate_limiter.until_ready().await;

        match self.try_fetch_collection(name).await {
            Ok(records) => {
                info!("Fetched {} records from collection {}", records.len(), name);
                records
            }
            Err(e) => {
                warn!("Failed to fetch from collection {}: {}", name, e);
                Vec::new()
            }
        }
    }

    async fn try_fetch_collection(&self, name: &str) -> Result<Vec<RawMatchRecord>> {
        let response = self.http_client.get(self.collection_url(name)).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Collection {
                name: name.to_string(),
                status,
            });
        }

        let body = response.text().await?;
        let envelope: Envelope = serde_json::from_str(&body)?;
        Ok(decode_records(name, envelope.items()?))
    }
}

/// Decode elements one by one; a bad element is dropped on its own.
fn decode_records(collection: &str, items: Vec<Value>) -> Vec<RawMatchRecord> {
    let total = items.len();
    let records: Vec<RawMatchRecord> = items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<RecordEnvelope>(item) {
            Ok(envelope) => envelope.data,
            Err(e) => {
                debug!("Dropping malformed record in {}: {}", collection, e);
                None
            }
        })
        .collect();

    if records.len() < total {
        debug!(
            "Dropped {}/{} records in collection {}",
            total - records.len(),
            total,
            collection
        );
    }
    records
}

/// Lazy, in-order walk over catalog collections.
///
/// Each call to [`CollectionScan::next`] fetches one more collection. The
/// caller decides when to stop; a scan can be resumed until it is exhausted.
pub struct CollectionScan<'a> {
    client: &'a CollectionsClient,
    names: std::vec::IntoIter<String>,
}

impl<'a> CollectionScan<'a> {
    pub fn new(client: &'a CollectionsClient, names: Vec<String>) -> Self {
        Self {
            client,
            names: names.into_iter(),
        }
    }

    pub async fn next(&mut self) -> Option<(String, Vec<RawMatchRecord>)> {
        let name = self.names.next()?;
        let records = self.client.fetch_collection(&name).await;
        Some((name, records))
    }

    /// Fetch collections until `stop` holds for one batch, keeping every batch
    /// fetched up to and including that one.
    pub async fn collect_until<F>(mut self, mut stop: F) -> Vec<Vec<RawMatchRecord>>
    where
        F: FnMut(&[RawMatchRecord]) -> bool,
    {
        let mut batches = Vec::new();
        while let Some((name, records)) = self.next().await {
            let done = stop(&records);
            batches.push(records);
            if done {
                info!("Collection {} has upcoming home fixtures, stopping scan", name);
                break;
            }
        }
        batches
    }
}
