//! Response shapes for the daily adjusted series endpoint.
//!
//! The API always answers with HTTP 200 and a JSON object, even when the
//! request was throttled or rejected. The top-level key tells the cases apart,
//! so responses are classified into [`RawPayload`] instead of deserialized
//! straight into a struct.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Top-level key holding the date-keyed series on success.
pub const DAILY_SERIES_KEY: &str = "Time Series (Daily)";
/// Top-level key holding request metadata on success.
pub const META_DATA_KEY: &str = "Meta Data";
/// Top-level keys the API uses for throttling notices, in priority order.
pub const RATE_LIMIT_KEYS: &[&str] = &["Note", "Information"];
/// Top-level key for permanent failures such as an unknown symbol.
pub const ERROR_MESSAGE_KEY: &str = "Error Message";

/// The `"Meta Data"` block of a successful response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetaData {
    #[serde(rename = "1. Information", default)]
    pub information: Option<String>,
    #[serde(rename = "2. Symbol", default)]
    pub symbol: Option<String>,
    #[serde(rename = "3. Last Refreshed", default)]
    pub last_refreshed: Option<String>,
    #[serde(rename = "4. Output Size", default)]
    pub output_size: Option<String>,
    #[serde(rename = "5. Time Zone", default)]
    pub time_zone: Option<String>,
}

/// A successful daily series.
///
/// Entries stay as raw JSON values keyed by the date string so that a single
/// malformed day cannot fail the whole response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DailySeries {
    pub meta: Option<MetaData>,
    pub entries: BTreeMap<String, Value>,
}

/// A classified response body for one symbol.
#[derive(Debug, Clone, PartialEq)]
pub enum RawPayload {
    /// The body carried the daily series key.
    Series(DailySeries),
    /// The body carried a throttling notice.
    RateLimited(String),
    /// The body carried an explicit error message.
    ErrorMessage(String),
    /// Any other JSON shape.
    Unrecognized(Value),
}

impl RawPayload {
    /// Classifies a decoded response body.
    ///
    /// The series key wins over every notice key, then rate-limit notices win
    /// over error messages.
    pub fn classify(value: Value) -> Self {
        let Value::Object(mut obj) = value else {
            return RawPayload::Unrecognized(value);
        };

        if let Some(series) = obj.remove(DAILY_SERIES_KEY) {
            let entries = match series {
                Value::Object(map) => map.into_iter().collect(),
                other => {
                    tracing::warn!("Daily series key holds a non-object value: {}", other);
                    BTreeMap::new()
                }
            };
            let meta = obj
                .remove(META_DATA_KEY)
                .and_then(|m| serde_json::from_value::<MetaData>(m).ok());
            return RawPayload::Series(DailySeries { meta, entries });
        }

        for key in RATE_LIMIT_KEYS {
            if let Some(note) = obj.get(*key) {
                return RawPayload::RateLimited(notice_text(note));
            }
        }

        if let Some(message) = obj.get(ERROR_MESSAGE_KEY) {
            return RawPayload::ErrorMessage(notice_text(message));
        }

        RawPayload::Unrecognized(Value::Object(obj))
    }

    /// The series, if this payload is a success.
    pub fn series(&self) -> Option<&DailySeries> {
        match self {
            RawPayload::Series(series) => Some(series),
            _ => None,
        }
    }

    /// Short label for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            RawPayload::Series(_) => "series",
            RawPayload::RateLimited(_) => "rate_limited",
            RawPayload::ErrorMessage(_) => "error_message",
            RawPayload::Unrecognized(_) => "unrecognized",
        }
    }
}

fn notice_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
