//! Library layer for the stock price ingester: fetch with retry, tolerant
//! parsing, idempotent SQLite upserts, and the per-ticker driving loop.
//!
//! Wraps the `alphavantage_api` crate, which only knows how to make one
//! request and classify its body.

pub mod config;
pub mod db;
pub mod fetcher;
pub mod parser;
pub mod pipeline;
pub mod retry;
pub mod types;

pub use alphavantage_api;
pub use alphavantage_api::{Client, OutputSize, RawPayload};

pub use config::{Config, ConfigError};
pub use db::{Db, DbError, StorageTarget, UPSERT_PAGE_SIZE};
pub use fetcher::{fetch_daily_adjusted, FetchError};
pub use parser::{parse_series, parse_with_report, ParseReport};
pub use pipeline::{run_for_tickers, PipelineConfig, PipelineError, RunSummary, TickerFailure};
pub use retry::{with_retry, RequestTracker, RetryOutcome, RetryPolicy, TrackerSummary};
pub use types::{PriceRow, StoredPrice};
