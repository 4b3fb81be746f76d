use std::time::Duration;

use thiserror::Error;

/// Errors raised while refreshing the feed.
///
/// Only catalog, transport-on-catalog and timeout errors escape a refresh.
/// A failing collection or broadcaster call is logged and degraded where it
/// happens.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Collections fetch failed: {status} {body}")]
    Catalog {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("status {status} for collection {name}")]
    Collection {
        name: String,
        status: reqwest::StatusCode,
    },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to decode upstream payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Refresh did not complete within {0:?}")]
    Timeout(Duration),
}

pub type Result<T> = std::result::Result<T, FeedError>;
