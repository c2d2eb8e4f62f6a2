//! Run configuration assembled from environment variables.
//!
//! The core never reads the environment itself; the binary builds a
//! [`Config`] once and hands the pieces to the pipeline.

use std::time::Duration;

use crate::db::StorageTarget;
use crate::pipeline::{PipelineConfig, DEFAULT_TICKER_PAUSE};
use crate::retry::{RetryPolicy, DEFAULT_BACKOFF_BASE, DEFAULT_MAX_RETRIES};
use alphavantage_api::OutputSize;

pub const TICKERS_VAR: &str = "TICKERS";
pub const API_KEY_VAR: &str = "ALPHAVANTAGE_API_KEY";
pub const DB_URL_VAR: &str = "DB_URL";
pub const BASE_URL_VAR: &str = "ALPHAVANTAGE_BASE_URL";
pub const OUTPUT_SIZE_VAR: &str = "ALPHAVANTAGE_OUTPUT_SIZE";
pub const MAX_RETRIES_VAR: &str = "STOCKPRICES_MAX_RETRIES";
pub const BACKOFF_SECS_VAR: &str = "STOCKPRICES_BACKOFF_SECS";
pub const TICKER_PAUSE_SECS_VAR: &str = "STOCKPRICES_TICKER_PAUSE_SECS";

/// Tickers used when `TICKERS` is unset.
pub const DEFAULT_TICKERS: &str = "AAPL,MSFT";

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
    #[error("invalid value for {key}: {reason}")]
    InvalidTarget { key: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub tickers: Vec<String>,
    pub api_key: String,
    pub storage: StorageTarget,
    /// Overrides the production API host (used against mock servers).
    pub base_url: Option<String>,
    pub output_size: OutputSize,
    pub retry: RetryPolicy,
    pub ticker_pause: Duration,
}

impl Config {
    /// Reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_key = get(API_KEY_VAR)
            .ok_or(ConfigError::Missing(API_KEY_VAR))?
            .trim()
            .to_string();
        let db_url = get(DB_URL_VAR).ok_or(ConfigError::Missing(DB_URL_VAR))?;
        let storage = StorageTarget::parse(&db_url).map_err(|e| ConfigError::InvalidTarget {
            key: DB_URL_VAR,
            reason: e.to_string(),
        })?;

        let tickers = split_tickers(&lookup(TICKERS_VAR).unwrap_or_else(|| DEFAULT_TICKERS.to_string()));

        let output_size = match get(OUTPUT_SIZE_VAR) {
            Some(v) => v.trim().parse::<OutputSize>().map_err(|_| ConfigError::Invalid {
                key: OUTPUT_SIZE_VAR,
                value: v.clone(),
            })?,
            None => OutputSize::Compact,
        };

        let max_retries = parse_u64(get(MAX_RETRIES_VAR), MAX_RETRIES_VAR, DEFAULT_MAX_RETRIES as u64)?;
        if max_retries == 0 || max_retries > u32::MAX as u64 {
            return Err(ConfigError::Invalid {
                key: MAX_RETRIES_VAR,
                value: max_retries.to_string(),
            });
        }
        let backoff_secs = parse_u64(get(BACKOFF_SECS_VAR), BACKOFF_SECS_VAR, DEFAULT_BACKOFF_BASE.as_secs())?;
        let pause_secs = parse_u64(
            get(TICKER_PAUSE_SECS_VAR),
            TICKER_PAUSE_SECS_VAR,
            DEFAULT_TICKER_PAUSE.as_secs(),
        )?;

        Ok(Self {
            tickers,
            api_key,
            storage,
            base_url: get(BASE_URL_VAR).map(|v| v.trim().to_string()),
            output_size,
            retry: RetryPolicy::new(max_retries as u32, Duration::from_secs(backoff_secs)),
            ticker_pause: Duration::from_secs(pause_secs),
        })
    }

    pub fn pipeline(&self) -> PipelineConfig {
        PipelineConfig {
            tickers: self.tickers.clone(),
            storage: self.storage.clone(),
            retry: self.retry,
            ticker_pause: self.ticker_pause,
            output_size: self.output_size,
        }
    }
}

/// Splits a comma-separated list. Entries are kept raw; the pipeline trims them.
pub fn split_tickers(raw: &str) -> Vec<String> {
    raw.split(',').map(str::to_string).collect()
}

fn parse_u64(value: Option<String>, key: &'static str, default: u64) -> Result<u64, ConfigError> {
    match value {
        Some(v) => v
            .trim()
            .parse::<u64>()
            .map_err(|_| ConfigError::Invalid { key, value: v.clone() }),
        None => Ok(default),
    }
}
