//! Per-ticker driving loop: fetch, parse, upsert, pause.
//!
//! Tickers are processed strictly one after another. A failure in any stage
//! is logged and recorded, and the loop moves on to the next ticker.

use std::error::Error as StdError;
use std::time::Duration;

use alphavantage_api::{Client, OutputSize};
use serde::Serialize;
use tokio::time::sleep;

use crate::db::{Db, DbError, StorageTarget};
use crate::fetcher::{fetch_with_output_size, FetchError};
use crate::parser::{parse_with_report, ParseReport};
use crate::retry::{RequestTracker, RetryPolicy};

/// Pause between tickers, sized for the free tier's 5 requests per minute.
pub const DEFAULT_TICKER_PAUSE: Duration = Duration::from_secs(12);

/// Everything one run needs besides the API client.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Raw ticker entries; trimmed, uppercased, and blanks dropped at run time.
    pub tickers: Vec<String>,
    pub storage: StorageTarget,
    pub retry: RetryPolicy,
    pub ticker_pause: Duration,
    pub output_size: OutputSize,
}

impl PipelineConfig {
    pub fn new(tickers: Vec<String>, storage: StorageTarget) -> Self {
        Self {
            tickers,
            storage,
            retry: RetryPolicy::default(),
            ticker_pause: DEFAULT_TICKER_PAUSE,
            output_size: OutputSize::Compact,
        }
    }
}

/// Why one ticker failed.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("storage failed: {0}")]
    Storage(#[from] DbError),
}

/// A ticker that could not be processed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickerFailure {
    pub ticker: String,
    pub error: String,
}

/// Totals for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub rows_upserted: usize,
    pub records_skipped: usize,
    pub failures: Vec<TickerFailure>,
}

/// Result of a successful ticker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickerOutcome {
    pub rows_upserted: usize,
    pub parse: ParseReport,
}

/// Trims, uppercases, and drops blank entries.
pub fn normalize_tickers<S: AsRef<str>>(raw: &[S]) -> Vec<String> {
    raw.iter()
        .map(|t| t.as_ref().trim())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_uppercase())
        .collect()
}

/// Fetch, parse, and upsert one ticker.
pub async fn process_ticker(
    client: &Client,
    ticker: &str,
    config: &PipelineConfig,
    tracker: &RequestTracker,
) -> Result<TickerOutcome, PipelineError> {
    let payload =
        fetch_with_output_size(client, ticker, config.output_size, &config.retry, tracker).await?;

    let (rows, parse) = parse_with_report(ticker, &payload);
    if parse.skipped > 0 {
        tracing::warn!(ticker, skipped = parse.skipped, "Skipped {} malformed records for {}", parse.skipped, ticker);
    }

    let rows_upserted = Db::upsert_prices(&config.storage, &rows)?;
    Ok(TickerOutcome {
        rows_upserted,
        parse,
    })
}

/// Runs the pipeline once over every configured ticker.
///
/// Never fails: per-ticker errors are logged and collected in the summary.
pub async fn run_for_tickers(client: &Client, config: &PipelineConfig) -> RunSummary {
    let tickers = normalize_tickers(&config.tickers);
    let tracker = RequestTracker::new();
    let mut summary = RunSummary::default();

    tracing::info!("Running for tickers: {:?}", tickers);

    for (idx, ticker) in tickers.iter().enumerate() {
        if idx > 0 && !config.ticker_pause.is_zero() {
            sleep(config.ticker_pause).await;
        }

        summary.processed += 1;
        match process_ticker(client, ticker, config, &tracker).await {
            Ok(outcome) => {
                tracing::info!(
                    ticker = %ticker,
                    rows = outcome.rows_upserted,
                    "Upserted {} rows for {}",
                    outcome.rows_upserted,
                    ticker
                );
                summary.succeeded += 1;
                summary.rows_upserted += outcome.rows_upserted;
                summary.records_skipped += outcome.parse.skipped;
            }
            Err(e) => {
                let chain = error_chain(&e);
                tracing::error!(ticker = %ticker, error = %chain, "Failed to process {}", ticker);
                summary.failed += 1;
                summary.failures.push(TickerFailure {
                    ticker: ticker.clone(),
                    error: chain,
                });
            }
        }
    }

    let requests = tracker.summary();
    tracing::info!(
        processed = summary.processed,
        succeeded = summary.succeeded,
        failed = summary.failed,
        rows = summary.rows_upserted,
        requests = requests.requests_made,
        backoff_secs = requests.total_backoff_secs,
        "Run complete"
    );

    summary
}

/// Joins an error and its sources into one line.
///
/// A source whose message is already embedded in the previous one is left out.
pub fn error_chain(err: &dyn StdError) -> String {
    let mut parts = vec![err.to_string()];
    let mut source = err.source();
    while let Some(e) = source {
        let msg = e.to_string();
        if !parts.last().is_some_and(|prev| prev.contains(&msg)) {
            parts.push(msg);
        }
        source = e.source();
    }
    parts.join(": ")
}
