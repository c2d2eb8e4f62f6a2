use anyhow::Result;
use clap::ValueEnum;
use serde::Serialize;
use stockprices_lib::StoredPrice;
use tabled::settings::Style;
use tabled::{Table, Tabled};

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
    Markdown,
}

#[derive(Tabled, Serialize)]
struct PriceDisplayRow {
    #[tabled(rename = "Date")]
    #[serde(rename = "Date")]
    trade_date: String,
    #[tabled(rename = "Open")]
    #[serde(rename = "Open")]
    open: String,
    #[tabled(rename = "High")]
    #[serde(rename = "High")]
    high: String,
    #[tabled(rename = "Low")]
    #[serde(rename = "Low")]
    low: String,
    #[tabled(rename = "Close")]
    #[serde(rename = "Close")]
    close: String,
    #[tabled(rename = "Adj Close")]
    #[serde(rename = "Adj Close")]
    adjusted_close: String,
    #[tabled(rename = "Volume")]
    #[serde(rename = "Volume")]
    volume: String,
    #[tabled(rename = "Fetched")]
    #[serde(rename = "Fetched")]
    fetched_at: String,
}

fn build_price_rows(prices: &[StoredPrice]) -> Vec<PriceDisplayRow> {
    prices
        .iter()
        .map(|p| PriceDisplayRow {
            trade_date: p.row.trade_date.to_string(),
            open: format_price(p.row.open),
            high: format_price(p.row.high),
            low: format_price(p.row.low),
            close: format_price(p.row.close),
            adjusted_close: format_price(p.row.adjusted_close),
            volume: p.row.volume.map(format_volume).unwrap_or_default(),
            fetched_at: p.fetched_at.clone(),
        })
        .collect()
}

pub fn print_prices_table(prices: &[StoredPrice]) {
    println!("{}", Table::new(build_price_rows(prices)));
}

pub fn print_prices_markdown(prices: &[StoredPrice]) {
    let mut table = Table::new(build_price_rows(prices));
    table.with(Style::markdown());
    println!("{}", table);
}

pub fn print_prices_csv(prices: &[StoredPrice]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(std::io::stdout());
    for row in build_price_rows(prices) {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn print_json<T: serde::Serialize>(data: &T) {
    match serde_json::to_string_pretty(data) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize to JSON: {}", e),
    }
}

fn format_price(value: Option<f64>) -> String {
    value.map(|v| format!("{:.4}", v)).unwrap_or_default()
}

fn format_volume(value: i64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use stockprices_lib::PriceRow;

    fn sample() -> Vec<StoredPrice> {
        vec![
            StoredPrice {
                row: PriceRow {
                    ticker: "IBM".to_string(),
                    trade_date: NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
                    open: Some(161.0),
                    high: Some(162.5),
                    low: Some(160.25),
                    close: Some(161.75),
                    adjusted_close: Some(158.1234),
                    volume: Some(4_123_456),
                },
                fetched_at: "2024-01-04 01:00:00".to_string(),
            },
            StoredPrice {
                row: PriceRow {
                    ticker: "IBM".to_string(),
                    trade_date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
                    open: None,
                    high: None,
                    low: None,
                    close: Some(160.0),
                    adjusted_close: None,
                    volume: None,
                },
                fetched_at: "2024-01-04 01:00:00".to_string(),
            },
        ]
    }

    #[test]
    fn test_format_volume_groups_thousands() {
        assert_eq!(format_volume(4_123_456), "4,123,456");
        assert_eq!(format_volume(999), "999");
        assert_eq!(format_volume(1000), "1,000");
        assert_eq!(format_volume(0), "0");
    }

    #[test]
    fn test_format_price_missing_is_blank() {
        assert_eq!(format_price(None), "");
        assert_eq!(format_price(Some(1.5)), "1.5000");
    }

    #[test]
    fn test_build_price_rows_mapping() {
        let rows = build_price_rows(&sample());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].trade_date, "2024-01-03");
        assert_eq!(rows[0].adjusted_close, "158.1234");
        assert_eq!(rows[0].volume, "4,123,456");
        assert_eq!(rows[1].open, "");
        assert_eq!(rows[1].volume, "");
    }

    #[test]
    fn test_csv_headers() {
        let mut wtr = csv::Writer::from_writer(Vec::new());
        for row in build_price_rows(&sample()) {
            wtr.serialize(row).unwrap();
        }
        wtr.flush().unwrap();
        let csv = String::from_utf8(wtr.into_inner().unwrap()).unwrap();
        assert_eq!(
            csv.lines().next().unwrap(),
            "Date,Open,High,Low,Close,Adj Close,Volume,Fetched"
        );
    }

    #[test]
    fn test_json_keeps_raw_values() {
        let val = serde_json::to_value(sample()).unwrap();
        assert_eq!(val[0]["ticker"], "IBM");
        assert_eq!(val[0]["volume"], 4_123_456);
        assert!(val[1]["open"].is_null());
    }

    #[test]
    fn test_markdown_structure() {
        let mut table = Table::new(build_price_rows(&sample()));
        table.with(Style::markdown());
        let md = table.to_string();
        assert!(md.contains('|'));
        assert!(md.contains("---"));
        assert!(md.lines().next().unwrap().contains("Adj Close"));
    }
}
