//! Error types for the API client.

/// Errors that can occur while requesting a time series.
///
/// A body that parses as JSON is never an error at this layer, even when it
/// carries a rate-limit or error notice; see [`crate::RawPayload`].
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Connection, timeout, or body-read failure.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    /// The API returned a non-success status with a body snippet.
    #[error("request failed with status {status}")]
    HttpStatus { status: u16, body: String },
    /// The body was not JSON.
    #[error("response is not valid JSON: {0}")]
    InvalidJson(String),
    /// The configured base URL could not be combined with the query path.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl Error {
    /// True for connection-level failures (as opposed to a response that arrived but was unusable).
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}
