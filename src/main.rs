//! Stockcast server: trains per-ticker price models in the background and
//! serves predictions over HTTP.
//!
//! # Environment Variables
//! - `API_KEY` - shared secret for the `access_token` header
//! - `PORT` - listen port (default: 8000)
//! - `MODEL_DIR` - artifact directory (default: models)
//! - `WINDOW_LENGTH` - trading days per model input (default: 60)
//! - `HISTORY_START` / `HISTORY_END` - provider date range
//! - `FOREST_N_TREES` / `FOREST_MAX_DEPTH` / `FOREST_MIN_SPLIT` - model knobs

use anyhow::Result;
use std::sync::Arc;
use stockcast::application::lifecycle::ModelLifecycle;
use stockcast::config::Config;
use stockcast::infrastructure::forest::ForestBackend;
use stockcast::infrastructure::model_store::FsModelStore;
use stockcast::infrastructure::observability::HttpMetrics;
use stockcast::infrastructure::yahoo::YahooFinanceService;
use stockcast::interfaces::http::{self, AppState};
use tracing::{info, warn, Level};
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stdout_layer)
        .init();

    info!("Stockcast {} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    if config.api_key.is_empty() {
        warn!("API_KEY is empty; authenticated routes will reject every request");
    }
    info!(
        model_dir = ?config.model_dir,
        window_length = config.window_length,
        "Configuration loaded"
    );

    let store = Arc::new(FsModelStore::new(&config.model_dir)?);
    let history = Arc::new(YahooFinanceService::new(
        config.history_start,
        config.history_end,
        config.fetch_timeout_secs,
    ));
    let backend = Arc::new(ForestBackend::new(
        config.n_trees,
        config.max_depth,
        config.min_samples_split,
    ));
    let lifecycle = Arc::new(ModelLifecycle::new(
        store,
        history,
        backend,
        config.window_length,
    ));

    let state = AppState {
        lifecycle,
        api_key: config.api_key.clone(),
        metrics: Arc::new(HttpMetrics::new()?),
    };

    http::serve(state, config.port).await
}
