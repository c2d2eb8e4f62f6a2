use anyhow::{bail, Context, Result};
use clap::Args;
use stockprices_lib::config::{DB_URL_VAR, TICKERS_VAR};
use stockprices_lib::{run_for_tickers, Client, Config, Db};

#[derive(Args)]
pub struct RunArgs {
    /// Comma-separated tickers (overrides TICKERS)
    #[arg(long)]
    pub tickers: Option<String>,

    /// SQLite database path (overrides DB_URL)
    #[arg(long)]
    pub db: Option<String>,

    /// Exit non-zero when any ticker fails
    #[arg(long)]
    pub strict: bool,
}

/// Environment lookup with the CLI flags layered on top.
fn lookup_with_overrides(args: &RunArgs, key: &str) -> Option<String> {
    match key {
        TICKERS_VAR if args.tickers.is_some() => args.tickers.clone(),
        DB_URL_VAR if args.db.is_some() => args.db.clone(),
        _ => std::env::var(key).ok(),
    }
}

pub async fn run(args: &RunArgs) -> Result<()> {
    let config = Config::from_lookup(|key| lookup_with_overrides(args, key))
        .context("invalid configuration")?;

    // The table must exist before the first upsert.
    Db::open(config.storage.path())
        .and_then(|db| db.init())
        .with_context(|| format!("failed to prepare {}", config.storage))?;

    let client = match &config.base_url {
        Some(url) => Client::with_base_url(url, config.api_key.clone()),
        None => Client::new(config.api_key.clone()),
    }
    .context("failed to build HTTP client")?;

    let summary = run_for_tickers(&client, &config.pipeline()).await;

    for failure in &summary.failures {
        tracing::warn!(ticker = %failure.ticker, "{}", failure.error);
    }
    tracing::info!(
        "{} of {} tickers stored, {} rows upserted, {} records skipped",
        summary.succeeded,
        summary.processed,
        summary.rows_upserted,
        summary.records_skipped
    );

    if args.strict && summary.failed > 0 {
        bail!("{} of {} tickers failed", summary.failed, summary.processed);
    }
    Ok(())
}
