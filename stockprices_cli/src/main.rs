mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "stockprices")]
#[command(about = "Fetch daily adjusted stock prices from Alpha Vantage into SQLite")]
struct Cli {
    /// Log line format
    #[arg(long, value_enum, default_value = "text", global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch and store prices for every configured ticker
    Run(commands::run::RunArgs),
    /// Create the prices table if it does not exist
    InitDb(commands::init_db::InitDbArgs),
    /// Print stored prices for one ticker
    Show(commands::show::ShowArgs),
}

/// Default levels for this workspace's crates; `RUST_LOG` adds to them.
const DEFAULT_LOG_DIRECTIVES: &[&str] = &["stockprices=info", "alphavantage_api=info"];

fn default_filter() -> Result<EnvFilter> {
    let mut filter = EnvFilter::from_default_env();
    for directive in DEFAULT_LOG_DIRECTIVES {
        filter = filter.add_directive(directive.parse()?);
    }
    Ok(filter)
}

fn init_logging(format: LogFormat) -> Result<()> {
    let filter = default_filter()?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.log_format)?;

    match &cli.command {
        Commands::Run(args) => commands::run::run(args).await?,
        Commands::InitDb(args) => commands::init_db::run(args)?,
        Commands::Show(args) => commands::show::run(args)?,
    }

    Ok(())
}
