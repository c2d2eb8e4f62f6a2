use std::process::Command;

use tempfile::TempDir;

fn stockprices() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_stockprices"));
    cmd.env_remove("ALPHAVANTAGE_API_KEY")
        .env_remove("DB_URL")
        .env_remove("TICKERS")
        .env("RUST_LOG", "off");
    cmd
}

#[test]
fn init_db_then_show_empty_ticker() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("prices.db");
    let db_arg = db.to_str().unwrap();

    let status = stockprices().args(["init-db", "--db", db_arg]).status().unwrap();
    assert!(status.success());
    assert!(db.exists());

    // Running twice is harmless.
    let status = stockprices().args(["init-db", "--db", db_arg]).status().unwrap();
    assert!(status.success());

    let out = stockprices()
        .args(["show", "--ticker", "ibm", "--db", db_arg, "--output", "json"])
        .output()
        .unwrap();
    assert!(out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("No stored prices for IBM"));
}

#[test]
fn run_without_api_key_fails() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("prices.db");

    let out = stockprices()
        .current_dir(dir.path())
        .args(["run", "--db", db.to_str().unwrap(), "--tickers", "IBM"])
        .output()
        .unwrap();
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("ALPHAVANTAGE_API_KEY"));
}

#[test]
fn show_without_database_target_fails() {
    let dir = TempDir::new().unwrap();
    let out = stockprices()
        .current_dir(dir.path())
        .args(["show", "--ticker", "IBM"])
        .output()
        .unwrap();
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("DB_URL"));
}
