use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    /// Shared secret checked against the `access_token` header.
    pub api_key: String,
    pub port: u16,
    pub model_dir: PathBuf,
    pub window_length: usize,
    /// Historical range requested from the data provider.
    pub history_start: NaiveDate,
    pub history_end: NaiveDate,
    pub fetch_timeout_secs: u64,
    // Random forest hyperparameters
    pub n_trees: usize,
    pub max_depth: u16,
    pub min_samples_split: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the config from an arbitrary variable source so tests never
    /// have to touch process env.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_key = get("API_KEY").unwrap_or_default();

        let port = get("PORT")
            .unwrap_or_else(|| "8000".to_string())
            .parse::<u16>()
            .context("Failed to parse PORT")?;

        let model_dir = PathBuf::from(get("MODEL_DIR").unwrap_or_else(|| "models".to_string()));

        let window_length = get("WINDOW_LENGTH")
            .unwrap_or_else(|| "60".to_string())
            .parse::<usize>()
            .context("Failed to parse WINDOW_LENGTH")?;
        anyhow::ensure!(window_length > 0, "WINDOW_LENGTH must be positive");

        let history_start = parse_date(get("HISTORY_START"), "HISTORY_START", "2010-01-01")?;
        let history_end = parse_date(get("HISTORY_END"), "HISTORY_END", "2024-01-01")?;

        let fetch_timeout_secs = get("FETCH_TIMEOUT_SECS")
            .unwrap_or_else(|| "30".to_string())
            .parse::<u64>()
            .context("Failed to parse FETCH_TIMEOUT_SECS")?;

        let n_trees = get("FOREST_N_TREES")
            .unwrap_or_else(|| "100".to_string())
            .parse::<usize>()
            .context("Failed to parse FOREST_N_TREES")?;

        let max_depth = get("FOREST_MAX_DEPTH")
            .unwrap_or_else(|| "10".to_string())
            .parse::<u16>()
            .context("Failed to parse FOREST_MAX_DEPTH")?;

        let min_samples_split = get("FOREST_MIN_SPLIT")
            .unwrap_or_else(|| "5".to_string())
            .parse::<usize>()
            .context("Failed to parse FOREST_MIN_SPLIT")?;

        Ok(Self {
            api_key,
            port,
            model_dir,
            window_length,
            history_start,
            history_end,
            fetch_timeout_secs,
            n_trees,
            max_depth,
            min_samples_split,
        })
    }
}

fn parse_date(value: Option<String>, name: &str, default: &str) -> Result<NaiveDate> {
    let raw = value.unwrap_or_else(|| default.to_string());
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
        .with_context(|| format!("Failed to parse {} as YYYY-MM-DD", name))
}
