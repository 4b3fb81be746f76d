//! Upcoming fixtures feed for a hockey venue display.
//!
//! Polls the club site's collections API, keeps the home fixtures (and, when
//! the broadcaster integration is on, televised first-team away fixtures),
//! and serves today's remaining matches or the next match day behind a
//! 30-minute cache.

pub mod aggregator;
pub mod broadcast;
pub mod cache;
pub mod classify;
pub mod clock;
pub mod config;
pub mod dedup;
pub mod endpoint;
pub mod error;
pub mod model;
pub mod time;
pub mod upstream;

pub use aggregator::Aggregator;
pub use cache::ResultCache;
pub use clock::{Clock, SystemClock};
pub use config::Config;
pub use endpoint::{router, MatchService};
pub use error::{FeedError, Result};
