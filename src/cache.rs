use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::clock::Clock;
use crate::model::MatchesPayload;

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub payload: MatchesPayload,
    pub computed_at: DateTime<Utc>,
}

/// Single process-wide slot holding the last successful refresh.
///
/// Reads within the TTL never touch the upstream. Concurrent misses are
/// collapsed: one caller refreshes while the others wait and then read
/// the fresh entry.
#[derive(Clone)]
pub struct ResultCache {
    slot: Arc<RwLock<Option<CacheEntry>>>,
    refresh: Arc<Mutex<()>>,
    ttl: chrono::Duration,
    clock: Arc<dyn Clock>,
}

impl ResultCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            slot: Arc::new(RwLock::new(None)),
            refresh: Arc::new(Mutex::new(())),
            ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::TimeDelta::MAX),
            clock,
        }
    }

    fn is_fresh(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        now - entry.computed_at < self.ttl
    }

    /// The cached payload if it is still within the TTL.
    pub async fn get(&self) -> Option<MatchesPayload> {
        let now = self.clock.now();
        let slot = self.slot.read().await;
        slot.as_ref()
            .filter(|entry| self.is_fresh(entry, now))
            .map(|entry| entry.payload.clone())
    }

    /// Last stored entry regardless of age.
    pub async fn last_entry(&self) -> Option<CacheEntry> {
        self.slot.read().await.clone()
    }

    /// Overwrite the slot, stamped with the current time.
    pub async fn store(&self, payload: MatchesPayload) {
        let entry = CacheEntry {
            payload,
            computed_at: self.clock.now(),
        };
        *self.slot.write().await = Some(entry);
    }

    /// Serve from the slot or run `refresh` once and store its result.
    ///
    /// A failed refresh leaves the previous entry in place.
    pub async fn get_or_refresh<F, Fut, E>(&self, refresh: F) -> Result<MatchesPayload, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<MatchesPayload, E>>,
    {
        // Fast path: read lock only
        if let Some(payload) = self.get().await {
            debug!("Matches cache hit");
            return Ok(payload);
        }

        let _guard = self.refresh.lock().await;

        // Another caller may have refreshed while we waited
        if let Some(payload) = self.get().await {
            debug!("Matches cache filled by concurrent refresh");
            return Ok(payload);
        }

        debug!("Matches cache miss, refreshing");
        let payload = refresh().await?;
        self.store(payload.clone()).await;
        Ok(payload)
    }
}
