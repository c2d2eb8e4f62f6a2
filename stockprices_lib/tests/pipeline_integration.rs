use std::time::{Duration, Instant};

use chrono::NaiveDate;
use stockprices_lib::pipeline::process_ticker;
use stockprices_lib::{
    run_for_tickers, Client, Db, PipelineConfig, PriceRow, RequestTracker, RetryPolicy,
    StorageTarget,
};
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn load_fixture(name: &str) -> String {
    std::fs::read_to_string(format!("tests/fixtures/{}", name)).unwrap()
}

/// A fresh database file with the schema applied.
fn init_db(dir: &TempDir) -> StorageTarget {
    let path = dir.path().join("prices.db");
    let db = Db::open(&path).unwrap();
    db.init().unwrap();
    StorageTarget::new(path)
}

fn fast_config(tickers: &[&str], storage: StorageTarget) -> PipelineConfig {
    let mut config = PipelineConfig::new(tickers.iter().map(|t| t.to_string()).collect(), storage);
    config.retry = RetryPolicy::new(2, Duration::from_millis(1));
    config.ticker_pause = Duration::ZERO;
    config
}

async fn mount_symbol(server: &MockServer, symbol: &str, body: String) {
    Mock::given(method("GET"))
        .and(path("/query"))
        .and(query_param("symbol", symbol))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn single_ticker_lands_in_storage() {
    let server = MockServer::start().await;
    mount_symbol(&server, "XYZ", load_fixture("xyz_single_day.json")).await;

    let dir = TempDir::new().unwrap();
    let storage = init_db(&dir);
    let client = Client::with_base_url(&server.uri(), "k".to_string()).unwrap();

    let summary = run_for_tickers(&client, &fast_config(&["xyz"], storage.clone())).await;
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.rows_upserted, 1);

    let db = Db::open(storage.path()).unwrap();
    let stored = db.prices_for_ticker("XYZ", None).unwrap();
    assert_eq!(
        stored[0].row,
        PriceRow {
            ticker: "XYZ".to_string(),
            trade_date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            open: Some(10.0),
            high: Some(12.0),
            low: Some(9.0),
            close: Some(11.0),
            adjusted_close: Some(11.0),
            volume: Some(1000),
        }
    );
}

#[tokio::test]
async fn one_bad_ticker_does_not_abort_the_run() {
    let server = MockServer::start().await;
    mount_symbol(
        &server,
        "BAD",
        serde_json::json!({"Error Message": "Invalid API call."}).to_string(),
    )
    .await;
    mount_symbol(&server, "ABC", load_fixture("mixed_quality.json")).await;
    mount_symbol(&server, "XYZ", load_fixture("xyz_single_day.json")).await;

    let dir = TempDir::new().unwrap();
    let storage = init_db(&dir);
    let client = Client::with_base_url(&server.uri(), "k".to_string()).unwrap();

    let summary = run_for_tickers(&client, &fast_config(&["BAD", "ABC", "XYZ"], storage.clone())).await;

    assert_eq!(summary.processed, 3);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.failures[0].ticker, "BAD");
    assert!(summary.failures[0].error.contains("Invalid API call."));
    // ABC: two good dates, one skipped; XYZ: one date
    assert_eq!(summary.rows_upserted, 3);
    assert_eq!(summary.records_skipped, 1);

    let db = Db::open(storage.path()).unwrap();
    assert_eq!(db.price_count(Some("BAD")).unwrap(), 0);
    assert_eq!(db.price_count(Some("ABC")).unwrap(), 2);

    let abc = db.prices_for_ticker("ABC", None).unwrap();
    let newest = &abc[0].row;
    assert_eq!(newest.open, None);
    assert_eq!(newest.high, Some(21.5));
    assert_eq!(newest.adjusted_close, Some(19.8));
    assert_eq!(newest.volume, Some(5000));
    assert_eq!(abc[1].row.volume, None);
}

#[tokio::test]
async fn empty_and_blank_tickers_make_no_requests() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let storage = init_db(&dir);
    let client = Client::with_base_url(&server.uri(), "k".to_string()).unwrap();

    let summary = run_for_tickers(&client, &fast_config(&[], storage.clone())).await;
    assert_eq!(summary.processed, 0);

    let summary = run_for_tickers(&client, &fast_config(&["", "  ", "\t"], storage)).await;
    assert_eq!(summary.processed, 0);
    assert!(summary.failures.is_empty());
}

#[tokio::test]
async fn storage_failure_is_isolated_per_ticker() {
    let server = MockServer::start().await;
    mount_symbol(&server, "XYZ", load_fixture("xyz_single_day.json")).await;

    // Schema never applied: the insert fails on a missing table.
    let dir = TempDir::new().unwrap();
    let storage = StorageTarget::new(dir.path().join("empty.db"));
    let client = Client::with_base_url(&server.uri(), "k".to_string()).unwrap();

    let summary = run_for_tickers(&client, &fast_config(&["XYZ", "XYZ"], storage)).await;
    assert_eq!(summary.processed, 2);
    assert_eq!(summary.failed, 2);
    assert!(summary.failures[0].error.starts_with("storage failed"));
}

#[tokio::test]
async fn rerun_overwrites_instead_of_duplicating() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(200).set_body_string(load_fixture("xyz_single_day.json")))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "Time Series (Daily)": {"2024-01-02": {
                "1. open": "10", "2. high": "13", "3. low": "9", "4. close": "12.5",
                "5. adjusted close": "12.4", "6. volume": "2000"
            }}
        })))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let storage = init_db(&dir);
    let client = Client::with_base_url(&server.uri(), "k".to_string()).unwrap();
    let config = fast_config(&["XYZ"], storage.clone());

    run_for_tickers(&client, &config).await;
    run_for_tickers(&client, &config).await;

    let db = Db::open(storage.path()).unwrap();
    assert_eq!(db.price_count(Some("XYZ")).unwrap(), 1);
    let stored = db.prices_for_ticker("XYZ", None).unwrap();
    assert_eq!(stored[0].row.close, Some(12.5));
    assert_eq!(stored[0].row.volume, Some(2000));
}

#[tokio::test]
async fn process_ticker_reports_parse_counts() {
    let server = MockServer::start().await;
    mount_symbol(&server, "ABC", load_fixture("mixed_quality.json")).await;

    let dir = TempDir::new().unwrap();
    let storage = init_db(&dir);
    let client = Client::with_base_url(&server.uri(), "k".to_string()).unwrap();
    let tracker = RequestTracker::new();

    let outcome = process_ticker(&client, "ABC", &fast_config(&["ABC"], storage), &tracker)
        .await
        .unwrap();

    assert_eq!(outcome.rows_upserted, 2);
    assert_eq!(outcome.parse.parsed, 2);
    assert_eq!(outcome.parse.skipped, 1);
}

#[tokio::test]
async fn pauses_between_tickers_but_not_after_the_last() {
    let pause = Duration::from_millis(400);
    let server = MockServer::start().await;
    mount_symbol(&server, "XYZ", load_fixture("xyz_single_day.json")).await;
    mount_symbol(&server, "ABC", load_fixture("mixed_quality.json")).await;

    let dir = TempDir::new().unwrap();
    let storage = init_db(&dir);
    let client = Client::with_base_url(&server.uri(), "k".to_string()).unwrap();

    let mut single = fast_config(&["XYZ"], storage.clone());
    single.ticker_pause = pause;
    let start = Instant::now();
    let summary = run_for_tickers(&client, &single).await;
    let single_elapsed = start.elapsed();
    assert_eq!(summary.succeeded, 1);
    assert!(single_elapsed < pause, "single ticker took {:?}", single_elapsed);

    let mut pair = fast_config(&["XYZ", "ABC"], storage);
    pair.ticker_pause = pause;
    let start = Instant::now();
    let summary = run_for_tickers(&client, &pair).await;
    let pair_elapsed = start.elapsed();
    assert_eq!(summary.succeeded, 2);
    assert!(pair_elapsed >= pause, "two tickers took {:?}", pair_elapsed);
    assert!(pair_elapsed < pause * 2, "two tickers took {:?}", pair_elapsed);
}
