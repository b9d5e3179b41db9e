//! Feed Ranking Service — Binary Entrypoint
//! Boots the Axum HTTP server, wiring routes, shared state, and middleware.

mod api;
mod auth;
mod badge;
mod config;
mod events;
mod fanout;
mod metrics;
mod model;
mod paging;
mod preferences;
mod scorer;
mod sections;
mod store;

use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use shuttle_axum::ShuttleAxum;
use tracing::warn;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::api::AppState;
use crate::auth::{TokenMap, DEFAULT_TOKENS_PATH};
use crate::config::{
    start_hot_reload_thread, ConfigHandle, RankingConfig, DEFAULT_RANKING_CONFIG_PATH,
    ENV_RANKING_CONFIG_PATH,
};
use crate::events::FeedEventBus;
use crate::store::{CandidateStore, MisconfiguredStore, RestStore};

/// Enable compact tracing logs in development only.
/// Activation requires BOTH:
///   - dev environment (debug build OR SHUTTLE_ENV in {local, development, dev})
///   - FEED_DEV_LOG=1
fn enable_dev_tracing() {
    if !config::dev_logging_enabled() {
        return;
    }

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("feed_ranker=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    // Initialize dev tracing early (no-op in production).
    enable_dev_tracing();

    // --- Ranking config + hot reload ---
    let ranking = RankingConfig::from_toml().expect("Failed to load ranking config");
    let config = ConfigHandle::new(ranking);
    let path = std::env::var(ENV_RANKING_CONFIG_PATH)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_RANKING_CONFIG_PATH));
    start_hot_reload_thread(config.clone(), path);

    // --- Storage client ---
    // A misconfigured store still boots; every request then fails with the
    // configuration reason as HTTP 500.
    let store: Arc<dyn CandidateStore> = match RestStore::from_env() {
        Ok(s) => Arc::new(s),
        Err(e) => {
            warn!(error = %e, "storage not configured");
            Arc::new(MisconfiguredStore {
                reason: e.to_string(),
            })
        }
    };

    let state = AppState {
        config,
        store,
        tokens: Arc::new(RwLock::new(TokenMap::load_from_file(DEFAULT_TOKENS_PATH))),
        events: FeedEventBus::default(),
    };

    let metrics = metrics::Metrics::init();
    let router = api::create_router(state).merge(metrics.router());

    Ok(router.into())
}
