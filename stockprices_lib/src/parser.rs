//! Turns a classified daily series into typed [`PriceRow`]s.
//!
//! Parsing never fails as a whole. A record with a bad date or a malformed
//! volume is skipped and logged. A bad price field becomes `None` and the rest
//! of the record survives.

use alphavantage_api::RawPayload;
use chrono::NaiveDate;
use serde_json::{Map, Value};

use crate::types::PriceRow;

pub const OPEN_KEY: &str = "1. open";
pub const HIGH_KEY: &str = "2. high";
pub const LOW_KEY: &str = "3. low";
pub const CLOSE_KEY: &str = "4. close";

/// Known spellings of the adjusted close field, tried in order.
pub const ADJUSTED_CLOSE_KEYS: &[&str] = &["5. adjusted close", "5. adjusted_close", "5. adjustedclose"];

/// Known spellings of the volume field, tried in order.
pub const VOLUME_KEYS: &[&str] = &["6. volume", "5. volume"];

/// Counts from one parse.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ParseReport {
    pub parsed: usize,
    pub skipped: usize,
}

/// Parses every record of a series payload. Non-series payloads yield no rows.
pub fn parse_series(ticker: &str, payload: &RawPayload) -> Vec<PriceRow> {
    parse_with_report(ticker, payload).0
}

/// Like [`parse_series`], also reporting how many records were skipped.
///
/// Rows come out in ascending date order because the series is keyed by
/// `YYYY-MM-DD` strings in a sorted map.
pub fn parse_with_report(ticker: &str, payload: &RawPayload) -> (Vec<PriceRow>, ParseReport) {
    let mut report = ParseReport::default();
    let Some(series) = payload.series() else {
        return (Vec::new(), report);
    };

    let mut rows = Vec::with_capacity(series.entries.len());
    for (date_str, record) in &series.entries {
        let Some(trade_date) = parse_trade_date(date_str) else {
            tracing::warn!(ticker, date = %date_str, "Skipping date {} for {}: not a YYYY-MM-DD date", date_str, ticker);
            report.skipped += 1;
            continue;
        };
        let Value::Object(fields) = record else {
            tracing::warn!(ticker, date = %date_str, "Skipping date {} for {}: record is not an object", date_str, ticker);
            report.skipped += 1;
            continue;
        };

        match build_row(ticker, trade_date, fields) {
            Ok(row) => {
                rows.push(row);
                report.parsed += 1;
            }
            Err(raw_volume) => {
                tracing::warn!(
                    ticker,
                    date = %date_str,
                    "Skipping date {} for {}: malformed volume {}",
                    date_str,
                    ticker,
                    raw_volume
                );
                report.skipped += 1;
            }
        }
    }

    (rows, report)
}

/// Fails with the raw volume value when it is present but not a non-negative integer.
fn build_row(
    ticker: &str,
    trade_date: NaiveDate,
    fields: &Map<String, Value>,
) -> Result<PriceRow, Value> {
    let volume = to_volume(first_present(fields, VOLUME_KEYS))?;
    Ok(PriceRow {
        ticker: ticker.to_string(),
        trade_date,
        open: to_price(fields.get(OPEN_KEY)),
        high: to_price(fields.get(HIGH_KEY)),
        low: to_price(fields.get(LOW_KEY)),
        close: to_price(fields.get(CLOSE_KEY)),
        adjusted_close: to_price(first_present(fields, ADJUSTED_CLOSE_KEYS)),
        volume,
    })
}

/// Strict `YYYY-MM-DD`; chrono alone would also accept unpadded months and days.
pub fn parse_trade_date(s: &str) -> Option<NaiveDate> {
    let bytes = s.as_bytes();
    if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return None;
    }
    if !bytes
        .iter()
        .enumerate()
        .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit())
    {
        return None;
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

/// The first candidate key holding a non-null, non-empty value.
fn first_present<'a>(fields: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| fields.get(*k))
        .find(|v| !is_blank(v))
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn to_price(value: Option<&Value>) -> Option<f64> {
    let price = match value? {
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        Value::Number(n) => n.as_f64()?,
        _ => return None,
    };
    price.is_finite().then_some(price)
}

/// `Ok(None)` when absent or blank, `Err` with the raw value when malformed.
fn to_volume(value: Option<&Value>) -> Result<Option<i64>, Value> {
    let Some(value) = value else {
        return Ok(None);
    };
    let volume = match value {
        Value::String(s) => s.trim().parse::<i64>().ok(),
        Value::Number(n) => n.as_i64(),
        _ => None,
    };
    match volume {
        Some(v) if v >= 0 => Ok(Some(v)),
        _ => Err(value.clone()),
    }
}
