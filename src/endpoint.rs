//! HTTP surface: `GET /api/matches` and `GET /health`.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{error, info};

use crate::aggregator::Aggregator;
use crate::cache::ResultCache;
use crate::clock::Clock;
use crate::error::FeedError;
use crate::model::{ErrorEnvelope, MatchesPayload, MatchesResponse};
use crate::time::to_iso;

/// Service health state
#[derive(Clone)]
pub struct HealthState {
    pub last_refresh_time: Arc<RwLock<Option<DateTime<Utc>>>>,
    pub last_match_count: Arc<RwLock<usize>>,
    pub error_count: Arc<RwLock<usize>>,
}

impl Default for HealthState {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthState {
    pub fn new() -> Self {
        Self {
            last_refresh_time: Arc::new(RwLock::new(None)),
            last_match_count: Arc::new(RwLock::new(0)),
            error_count: Arc::new(RwLock::new(0)),
        }
    }

    pub async fn record_success(&self, at: DateTime<Utc>, count: usize) {
        *self.last_refresh_time.write().await = Some(at);
        *self.last_match_count.write().await = count;
        *self.error_count.write().await = 0;
    }

    pub async fn record_error(&self) {
        *self.error_count.write().await += 1;
    }
}

/// Cached matches feed behind the endpoint.
pub struct MatchService {
    aggregator: Aggregator,
    cache: ResultCache,
    clock: Arc<dyn Clock>,
    health: HealthState,
    request_timeout: Duration,
}

impl MatchService {
    pub fn new(
        aggregator: Aggregator,
        cache: ResultCache,
        clock: Arc<dyn Clock>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            aggregator,
            cache,
            clock,
            health: HealthState::new(),
            request_timeout,
        }
    }

    pub fn health(&self) -> HealthState {
        self.health.clone()
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    async fn refresh(&self) -> Result<MatchesPayload, FeedError> {
        let started = std::time::Instant::now();
        let now = self.clock.now();

        let result = tokio::time::timeout(self.request_timeout, self.aggregator.run(now))
            .await
            .unwrap_or(Err(FeedError::Timeout(self.request_timeout)));

        match &result {
            Ok(payload) => {
                self.health.record_success(now, payload.matches.len()).await;
                info!(
                    "Refresh completed: {} matches in {:?}",
                    payload.matches.len(),
                    started.elapsed()
                );
            }
            Err(_) => self.health.record_error().await,
        }
        result
    }

    /// Current payload, from the cache when fresh.
    pub async fn matches(&self) -> Result<MatchesPayload, FeedError> {
        self.cache.get_or_refresh(|| self.refresh()).await
    }

    /// Status code and JSON body for `GET /api/matches`.
    pub async fn respond(&self) -> (StatusCode, Value) {
        match self.matches().await {
            Ok(payload) => {
                let body = MatchesResponse {
                    matches: &payload.matches,
                    is_today: payload.is_today,
                    server_time: self.clock.now(),
                };
                match serde_json::to_value(&body) {
                    Ok(value) => (StatusCode::OK, value),
                    Err(e) => failure(&e.to_string()),
                }
            }
            Err(e) => {
                error!("Matches API error: {}", e);
                failure(&e.to_string())
            }
        }
    }
}

fn failure(message: &str) -> (StatusCode, Value) {
    let envelope = ErrorEnvelope::server_error(message);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        serde_json::to_value(&envelope).unwrap_or_else(|_| json!({ "error": true })),
    )
}

async fn matches_handler(State(service): State<Arc<MatchService>>) -> Response {
    let (status, body) = service.respond().await;
    (status, Json(body)).into_response()
}

/// Health check handler
async fn health_handler(State(service): State<Arc<MatchService>>) -> (StatusCode, Json<Value>) {
    let health = service.health();
    let last_refresh = health.last_refresh_time.read().await;
    let last_count = health.last_match_count.read().await;
    let errors = health.error_count.read().await;

    let status = if *errors > 5 { "degraded" } else { "ok" };

    let http_status = if *errors > 10 {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    (
        http_status,
        Json(json!({
            "service": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
            "status": status,
            "last_refresh": last_refresh.as_ref().map(to_iso),
            "last_match_count": *last_count,
            "consecutive_errors": *errors
        })),
    )
}

pub fn router(service: Arc<MatchService>) -> Router {
    Router::new()
        .route("/api/matches", get(matches_handler))
        .route("/health", get(health_handler))
        .with_state(service)
}
