//! SQLite storage for daily prices.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use rusqlite::{params, Connection, ToSql};

use crate::types::{PriceRow, StoredPrice};

/// Rows per multi-row INSERT statement. Pages share one transaction.
pub const UPSERT_PAGE_SIZE: usize = 500;

const COLUMNS_PER_ROW: usize = 8;

#[derive(thiserror::Error, Debug)]
pub enum DbError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("date parse error: {0}")]
    Date(#[from] chrono::ParseError),
    #[error("invalid storage target: {0}")]
    InvalidTarget(String),
}

/// Location of the SQLite database that receives price rows.
///
/// Accepts a plain path or a `sqlite://` / `sqlite:` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageTarget {
    path: PathBuf,
}

impl StorageTarget {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn parse(raw: &str) -> Result<Self, DbError> {
        let trimmed = raw.trim();
        let path = trimmed
            .strip_prefix("sqlite://")
            .or_else(|| trimmed.strip_prefix("sqlite:"))
            .unwrap_or(trimmed);

        if path.is_empty() {
            return Err(DbError::InvalidTarget("empty path".to_string()));
        }
        if let Some((scheme, _)) = path.split_once("://") {
            return Err(DbError::InvalidTarget(format!(
                "unsupported scheme '{}': only SQLite targets are supported (a file path or sqlite:// URL)",
                scheme
            )));
        }
        Ok(Self::new(path))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Display for StorageTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

pub struct Db {
    conn: Connection,
}

impl Db {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    /// Creates the `stock_prices` table and its index if they are missing.
    pub fn init(&self) -> Result<(), DbError> {
        let schema = include_str!("../../schema/sqlite.sql");
        self.conn.execute_batch(schema)?;
        Ok(())
    }

    /// Opens `target`, upserts `rows` in one transaction, and closes the connection.
    ///
    /// An empty slice returns 0 without touching the database.
    pub fn upsert_prices(target: &StorageTarget, rows: &[PriceRow]) -> Result<usize, DbError> {
        if rows.is_empty() {
            return Ok(0);
        }
        let mut db = Db::open(target.path())?;
        db.upsert_rows(rows)
    }

    /// Inserts or overwrites rows keyed on `(ticker, trade_date)`.
    ///
    /// Rows are written in pages of [`UPSERT_PAGE_SIZE`] within a single
    /// transaction; any failure rolls back every page.
    pub fn upsert_rows(&mut self, rows: &[PriceRow]) -> Result<usize, DbError> {
        if rows.is_empty() {
            return Ok(0);
        }

        let tx = self.conn.transaction()?;
        let mut count = 0;
        for page in rows.chunks(UPSERT_PAGE_SIZE) {
            let sql = upsert_sql(page.len());
            let mut stmt = tx.prepare_cached(&sql)?;

            let dates: Vec<String> = page
                .iter()
                .map(|r| r.trade_date.format("%Y-%m-%d").to_string())
                .collect();
            let mut values: Vec<&dyn ToSql> = Vec::with_capacity(page.len() * COLUMNS_PER_ROW);
            for (row, date) in page.iter().zip(&dates) {
                values.push(&row.ticker);
                values.push(date);
                values.push(&row.open);
                values.push(&row.high);
                values.push(&row.low);
                values.push(&row.close);
                values.push(&row.adjusted_close);
                values.push(&row.volume);
            }

            stmt.execute(values.as_slice())?;
            count += page.len();
        }
        tx.commit()?;
        Ok(count)
    }

    /// Stored rows for one ticker, newest first.
    pub fn prices_for_ticker(
        &self,
        ticker: &str,
        limit: Option<i64>,
    ) -> Result<Vec<StoredPrice>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT ticker, trade_date, open, high, low, close, adjusted_close, volume, fetched_at
             FROM stock_prices
             WHERE ticker = ?1
             ORDER BY trade_date DESC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![ticker, limit.unwrap_or(-1)], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<f64>>(2)?,
                row.get::<_, Option<f64>>(3)?,
                row.get::<_, Option<f64>>(4)?,
                row.get::<_, Option<f64>>(5)?,
                row.get::<_, Option<f64>>(6)?,
                row.get::<_, Option<i64>>(7)?,
                row.get::<_, String>(8)?,
            ))
        })?;

        let mut result = Vec::new();
        for row in rows {
            let (ticker, date, open, high, low, close, adjusted_close, volume, fetched_at) = row?;
            result.push(StoredPrice {
                row: PriceRow {
                    ticker,
                    trade_date: NaiveDate::parse_from_str(&date, "%Y-%m-%d")?,
                    open,
                    high,
                    low,
                    close,
                    adjusted_close,
                    volume,
                },
                fetched_at,
            });
        }
        Ok(result)
    }

    /// Number of stored rows, optionally for one ticker.
    pub fn price_count(&self, ticker: Option<&str>) -> Result<i64, DbError> {
        let count: i64 = match ticker {
            Some(t) => self.conn.query_row(
                "SELECT COUNT(1) FROM stock_prices WHERE ticker = ?1",
                params![t],
                |row| row.get(0),
            )?,
            None => self
                .conn
                .query_row("SELECT COUNT(1) FROM stock_prices", [], |row| row.get(0))?,
        };
        Ok(count)
    }
}

fn upsert_sql(row_count: usize) -> String {
    let placeholders = vec!["(?, ?, ?, ?, ?, ?, ?, ?)"; row_count].join(",\n            ");
    format!(
        "INSERT INTO stock_prices
            (ticker, trade_date, open, high, low, close, adjusted_close, volume)
         VALUES
            {}
         ON CONFLICT(ticker, trade_date) DO UPDATE SET
            open = excluded.open,
            high = excluded.high,
            low = excluded.low,
            close = excluded.close,
            adjusted_close = excluded.adjusted_close,
            volume = excluded.volume,
            fetched_at = datetime('now')",
        placeholders
    )
}
