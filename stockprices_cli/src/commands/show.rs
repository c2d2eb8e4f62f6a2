use anyhow::{Context, Result};
use clap::Args;
use stockprices_lib::Db;

use super::resolve_storage;
use crate::output::{print_json, print_prices_csv, print_prices_markdown, print_prices_table, OutputFormat};

#[derive(Args)]
pub struct ShowArgs {
    /// Ticker symbol
    #[arg(long)]
    pub ticker: String,

    /// SQLite database path (defaults to DB_URL)
    #[arg(long)]
    pub db: Option<String>,

    /// Maximum rows, newest first
    #[arg(long)]
    pub limit: Option<i64>,

    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    pub output: OutputFormat,
}

pub fn run(args: &ShowArgs) -> Result<()> {
    let target = resolve_storage(args.db.as_deref())?;
    let db = Db::open(target.path()).with_context(|| format!("failed to open {}", target))?;
    let ticker = args.ticker.trim().to_uppercase();
    let prices = db
        .prices_for_ticker(&ticker, args.limit)
        .with_context(|| format!("failed to read prices for {}", ticker))?;

    if prices.is_empty() {
        eprintln!("No stored prices for {}", ticker);
        return Ok(());
    }

    match args.output {
        OutputFormat::Table => print_prices_table(&prices),
        OutputFormat::Json => print_json(&prices),
        OutputFormat::Csv => print_prices_csv(&prices)?,
        OutputFormat::Markdown => print_prices_markdown(&prices),
    }
    Ok(())
}
