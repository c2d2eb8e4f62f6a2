//! Fetch one ticker's daily adjusted series with rate-limit-aware retry.

use alphavantage_api::{Client, DailyAdjustedQuery, OutputSize, RawPayload};
use thiserror::Error;

use crate::retry::{RequestTracker, RetryPolicy};

/// Longest snippet of an unrecognized body kept in an error.
const DETAIL_MAX: usize = 300;

/// Errors from fetching a ticker's series.
#[derive(Error, Debug)]
pub enum FetchError {
    /// The API kept answering with a throttling notice until the attempt budget ran out.
    #[error("rate limit reached for {ticker} and max retries exceeded after {attempts} attempts")]
    RateLimitExceeded { ticker: String, attempts: u32 },
    /// The API answered with an explicit error message. Never retried.
    #[error("error from API for {ticker}: {message}")]
    Upstream { ticker: String, message: String },
    /// Non-200 status, non-JSON body, or a JSON shape with none of the known keys.
    #[error("unexpected response for {ticker}: {detail}")]
    UnexpectedResponse { ticker: String, detail: String },
    /// The request could not be built, e.g. a malformed base URL. Never retried.
    #[error("invalid request for {ticker}")]
    InvalidRequest {
        ticker: String,
        #[source]
        source: alphavantage_api::Error,
    },
    /// Connection or timeout failure on the last attempt.
    #[error("request failed for {ticker}")]
    Network {
        ticker: String,
        #[source]
        source: alphavantage_api::Error,
    },
}

impl FetchError {
    /// Whether another attempt could succeed.
    ///
    /// An explicit API error message and an unbuildable request are permanent.
    /// Unrecognized responses are retried like network failures.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Upstream { .. } | Self::InvalidRequest { .. })
    }

    pub fn ticker(&self) -> &str {
        match self {
            Self::RateLimitExceeded { ticker, .. }
            | Self::Upstream { ticker, .. }
            | Self::UnexpectedResponse { ticker, .. }
            | Self::InvalidRequest { ticker, .. }
            | Self::Network { ticker, .. } => ticker,
        }
    }
}

/// Fetches the compact daily adjusted series for `ticker`.
///
/// Returns only [`RawPayload::Series`] on success. Every attempt is one HTTP
/// request; the whole call makes at most `policy.max_retries` of them.
pub async fn fetch_daily_adjusted(
    client: &Client,
    ticker: &str,
    policy: &RetryPolicy,
    tracker: &RequestTracker,
) -> Result<RawPayload, FetchError> {
    fetch_with_output_size(client, ticker, OutputSize::Compact, policy, tracker).await
}

/// Same as [`fetch_daily_adjusted`] with an explicit output size.
pub async fn fetch_with_output_size(
    client: &Client,
    ticker: &str,
    output_size: OutputSize,
    policy: &RetryPolicy,
    tracker: &RequestTracker,
) -> Result<RawPayload, FetchError> {
    let query = DailyAdjustedQuery::new(ticker).with_output_size(output_size);
    let max_attempts = policy.max_retries.max(1);

    let outcome = policy
        .run(tracker, FetchError::is_retryable, |attempt| {
            attempt_fetch(client, &query, attempt, max_attempts)
        })
        .await;

    let attempts = outcome.attempts();
    let result = outcome.into_result();
    if let Err(ref e) = result {
        tracing::debug!(ticker, attempts, "Fetch gave up: {}", e);
    }
    result
}

async fn attempt_fetch(
    client: &Client,
    query: &DailyAdjustedQuery,
    attempt: u32,
    max_attempts: u32,
) -> Result<RawPayload, FetchError> {
    let ticker = query.symbol.as_str();

    match client.get_daily_adjusted(query).await {
        Ok(payload @ RawPayload::Series(_)) => Ok(payload),
        Ok(RawPayload::RateLimited(note)) => {
            tracing::warn!(
                ticker,
                attempt,
                max_attempts,
                "API rate limit hit for {}: {}",
                ticker,
                note
            );
            Err(FetchError::RateLimitExceeded {
                ticker: ticker.to_string(),
                attempts: attempt,
            })
        }
        Ok(RawPayload::ErrorMessage(message)) => Err(FetchError::Upstream {
            ticker: ticker.to_string(),
            message,
        }),
        Ok(RawPayload::Unrecognized(value)) => Err(FetchError::UnexpectedResponse {
            ticker: ticker.to_string(),
            detail: truncate(&format!("unexpected payload: {}", value)),
        }),
        Err(alphavantage_api::Error::HttpStatus { status, body }) => {
            Err(FetchError::UnexpectedResponse {
                ticker: ticker.to_string(),
                detail: truncate(&format!("HTTP {}: {}", status, body)),
            })
        }
        Err(e @ alphavantage_api::Error::InvalidUrl(_)) => Err(FetchError::InvalidRequest {
            ticker: ticker.to_string(),
            source: e,
        }),
        Err(e) if e.is_network() => {
            tracing::error!(
                ticker,
                attempt,
                max_attempts,
                error = %e,
                "Request failed for {}",
                ticker
            );
            Err(FetchError::Network {
                ticker: ticker.to_string(),
                source: e,
            })
        }
        Err(e) => Err(FetchError::UnexpectedResponse {
            ticker: ticker.to_string(),
            detail: truncate(&e.to_string()),
        }),
    }
}

fn truncate(s: &str) -> String {
    if s.len() <= DETAIL_MAX {
        return s.to_string();
    }
    let mut end = DETAIL_MAX;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}
