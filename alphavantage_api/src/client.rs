//! HTTP client for the Alpha Vantage query endpoint.

use std::time::Duration;

use url::Url;

use crate::{query::DailyAdjustedQuery, types::RawPayload, Error};

/// Request timeout for a single API call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Production base URL.
const DEFAULT_BASE_URL: &str = "https://www.alphavantage.co";

/// HTTP client for the Alpha Vantage API.
///
/// One client is built per run and reused for every symbol. Each call makes
/// exactly one request; retrying is left to the caller.
pub struct Client {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl Client {
    /// Creates a client pointing at the production API.
    pub fn new(api_key: String) -> Result<Self, Error> {
        Self::with_base_url(DEFAULT_BASE_URL, api_key)
    }

    /// Creates a client with a custom base URL. Used for testing with wiremock.
    pub fn with_base_url(base_url: &str, api_key: String) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("stockprices/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn get_url(&self, query: &DailyAdjustedQuery) -> Result<Url, Error> {
        let url = Url::parse(format!("{}/query", &self.base_url).as_str()).map_err(|e| {
            tracing::error!("Invalid URL constructed: {}", e);
            Error::InvalidUrl(e.to_string())
        })?;
        Ok(query.add_to_url(&url, &self.api_key))
    }

    /// Fetches the daily adjusted series for one symbol and classifies the body.
    ///
    /// Returns `Ok` for every JSON body, including rate-limit and error
    /// notices. Non-200 statuses, non-JSON bodies, and transport failures are
    /// errors. Transport errors have the URL stripped so the API key never
    /// reaches the logs.
    pub async fn get_daily_adjusted(&self, query: &DailyAdjustedQuery) -> Result<RawPayload, Error> {
        let url = self.get_url(query)?;
        tracing::debug!(symbol = %query.symbol, "Requesting daily adjusted series");

        let resp = self
            .client
            .get(url)
            .header("accept", "application/json")
            .send()
            .await
            .map_err(|e| Error::Network(e.without_url()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| Error::Network(e.without_url()))?;

        if status != reqwest::StatusCode::OK {
            let snippet = truncate_body(&body);
            tracing::error!("Request for {} failed with status {}: {}", query.symbol, status, snippet);
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                body: snippet,
            });
        }

        let value = serde_json::from_str::<serde_json::Value>(&body).map_err(|e| {
            let snippet = truncate_body(&body);
            tracing::error!("Failed to parse response for {}: {} | body: {}", query.symbol, e, snippet);
            Error::InvalidJson(format!("{} | body: {}", e, snippet))
        })?;

        Ok(RawPayload::classify(value))
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 500;
    if body.len() <= MAX {
        body.to_string()
    } else {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...[truncated]", &body[..end])
    }
}
