//! CLI subcommand implementations.

pub mod init_db;
pub mod run;
pub mod show;

use anyhow::{Context, Result};
use stockprices_lib::config::DB_URL_VAR;
use stockprices_lib::StorageTarget;

/// Picks the `--db` flag over `DB_URL`.
pub fn resolve_storage(flag: Option<&str>) -> Result<StorageTarget> {
    resolve_storage_with(flag, |key| std::env::var(key).ok())
}

fn resolve_storage_with<F>(flag: Option<&str>, lookup: F) -> Result<StorageTarget>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = match flag {
        Some(db) => db.to_string(),
        None => lookup(DB_URL_VAR)
            .filter(|v| !v.trim().is_empty())
            .with_context(|| format!("pass --db or set {}", DB_URL_VAR))?,
    };
    StorageTarget::parse(&raw).with_context(|| format!("invalid database target {:?}", raw))
}
