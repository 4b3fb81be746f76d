//! Matchday feed service
//!
//! Serves the venue's current or next match day at `GET /api/matches`,
//! refreshed from the club site at most once per cache window.

use std::sync::Arc;

use anyhow::{Context, Result};
use matchday_feed::{router, Aggregator, Clock, Config, MatchService, ResultCache, SystemClock};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("matchday_feed=info".parse()?),
        )
        .init();

    info!("Matchday feed v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env();
    info!(
        "Home venues: {:?}, cache TTL {:?}, broadcaster {}",
        config.home_venues,
        config.cache_ttl,
        if config.viaplay_enabled { "enabled" } else { "disabled" }
    );

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let aggregator = Aggregator::from_config(&config).context("Failed to create HTTP client")?;
    let cache = ResultCache::new(config.cache_ttl, clock.clone());
    let service = Arc::new(MatchService::new(
        aggregator,
        cache,
        clock,
        config.request_timeout,
    ));

    // One-shot mode: refresh once, print the payload and exit
    if config.run_once {
        info!("Running in one-shot mode (RUN_ONCE=true)");
        let (status, body) = service.respond().await;
        println!("{}", serde_json::to_string_pretty(&body)?);
        if !status.is_success() {
            error!("One-shot refresh failed");
            anyhow::bail!("refresh failed with status {}", status);
        }
        return Ok(());
    }

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on {}", addr);

    axum::serve(listener, router(service))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Shutting down...");
        })
        .await
        .context("Server error")?;

    Ok(())
}
