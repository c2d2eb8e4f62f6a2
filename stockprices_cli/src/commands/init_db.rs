use anyhow::{Context, Result};
use clap::Args;
use stockprices_lib::Db;

use super::resolve_storage;

#[derive(Args)]
pub struct InitDbArgs {
    /// SQLite database path (defaults to DB_URL)
    #[arg(long)]
    pub db: Option<String>,
}

pub fn run(args: &InitDbArgs) -> Result<()> {
    let target = resolve_storage(args.db.as_deref())?;
    let db = Db::open(target.path()).with_context(|| format!("failed to open {}", target))?;
    db.init().context("failed to apply schema")?;
    tracing::info!("Initialized {}", target);
    Ok(())
}
