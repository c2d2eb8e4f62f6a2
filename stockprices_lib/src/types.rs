//! Row types shared by the parser, the database layer, and the CLI.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One day of prices for one ticker, as written to `stock_prices`.
///
/// `(ticker, trade_date)` is the natural key. Prices and volume are `None`
/// when the source value was missing or could not be coerced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRow {
    pub ticker: String,
    pub trade_date: NaiveDate,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub adjusted_close: Option<f64>,
    pub volume: Option<i64>,
}

/// A row read back from storage, with the server-assigned fetch timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredPrice {
    #[serde(flatten)]
    pub row: PriceRow,
    pub fetched_at: String,
}
