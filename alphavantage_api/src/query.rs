//! Query builder for the `TIME_SERIES_DAILY_ADJUSTED` endpoint.

use std::fmt;
use std::str::FromStr;

use url::Url;

/// Value of the `function` parameter for the daily adjusted series.
pub const DAILY_ADJUSTED_FUNCTION: &str = "TIME_SERIES_DAILY_ADJUSTED";

/// How much history the API returns.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputSize {
    /// The latest 100 data points. This is the default.
    #[default]
    Compact,
    /// The full 20+ year history.
    Full,
}

impl fmt::Display for OutputSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            OutputSize::Compact => "compact",
            OutputSize::Full => "full",
        };
        write!(f, "{}", value)
    }
}

impl FromStr for OutputSize {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "compact" => Ok(OutputSize::Compact),
            "full" => Ok(OutputSize::Full),
            _ => Err(()),
        }
    }
}

/// Parameters for a single daily adjusted series request.
#[derive(Clone, Debug)]
pub struct DailyAdjustedQuery {
    pub symbol: String,
    pub output_size: OutputSize,
}

impl DailyAdjustedQuery {
    pub fn new(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            output_size: OutputSize::default(),
        }
    }

    pub fn with_output_size(mut self, output_size: OutputSize) -> Self {
        self.output_size = output_size;
        self
    }

    /// Appends the query parameters, including the API key, to the given URL.
    pub fn add_to_url(&self, url: &Url, api_key: &str) -> Url {
        let mut url = url.clone();
        url.query_pairs_mut()
            .append_pair("function", DAILY_ADJUSTED_FUNCTION)
            .append_pair("symbol", &self.symbol)
            .append_pair("apikey", api_key)
            .append_pair("outputsize", &self.output_size.to_string())
            .append_pair("datatype", "json");
        url
    }
}
