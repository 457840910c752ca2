//! List pagination and free-text search.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use serde_json::Value;

use gadget_shop_integration_tests::TestApp;

fn titles(body: &Value) -> Vec<&str> {
    body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["title"].as_str().unwrap())
        .collect()
}

#[tokio::test]
async fn test_pages_and_links() {
    let app = TestApp::new();

    let first = app.get("/api/smartphones?page_size=2").await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.body["count_objects"], 3);
    assert_eq!(titles(&first.body), vec!["Alpha Phone", "Beta Phone Pro"]);
    assert_eq!(
        first.body["next_item"],
        "http://localhost:3000/api/smartphones?page=2&page_size=2"
    );
    assert!(first.body["previous_item"].is_null());

    let second = app.get("/api/smartphones?page=2&page_size=2").await;
    assert_eq!(titles(&second.body), vec!["Gamma Lite"]);
    assert!(second.body["next_item"].is_null());
    assert_eq!(
        second.body["previous_item"],
        "http://localhost:3000/api/smartphones?page=1&page_size=2"
    );
}

#[tokio::test]
async fn test_invalid_pages() {
    let app = TestApp::new();

    let past_end = app.get("/api/smartphones?page=3&page_size=2").await;
    assert_eq!(past_end.status, StatusCode::NOT_FOUND);

    let zero = app.get("/api/notebooks?page=0").await;
    assert_eq!(zero.status, StatusCode::BAD_REQUEST);

    let garbage = app.get("/api/notebooks?page=two").await;
    assert_eq!(garbage.status, StatusCode::BAD_REQUEST);
    assert_eq!(garbage.body["error"], "bad_request");
}

#[tokio::test]
async fn test_search_smartphones() {
    let app = TestApp::new();

    // Title, case-insensitive
    let pro = app.get("/api/smartphones?search=PRO").await;
    assert_eq!(titles(&pro.body), vec!["Beta Phone Pro"]);

    // Every term must match some field
    let both = app.get("/api/smartphones?search=phone%205000").await;
    assert_eq!(titles(&both.body), vec!["Beta Phone Pro"]);

    // Battery capacity
    let battery = app.get("/api/smartphones?search=3000+mah").await;
    assert_eq!(titles(&battery.body), vec!["Gamma Lite"]);

    // Price
    let price = app.get("/api/smartphones?search=599.99").await;
    assert_eq!(titles(&price.body), vec!["Alpha Phone"]);

    let none = app.get("/api/smartphones?search=tablet").await;
    assert_eq!(none.status, StatusCode::OK);
    assert_eq!(none.body["count_objects"], 0);
}

#[tokio::test]
async fn test_search_notebooks_keeps_query_in_links() {
    let app = TestApp::new();

    let rtx = app.get("/api/notebooks?search=rtx").await;
    assert_eq!(titles(&rtx.body), vec!["Work 15 Pro"]);

    // Smartphone-only fields are not searched for notebooks
    let mah = app.get("/api/notebooks?search=mah").await;
    assert_eq!(mah.body["count_objects"], 0);

    let paged = app
        .get("/api/notebooks?search=integrated+pro&page_size=1")
        .await;
    assert_eq!(paged.body["count_objects"], 0);

    let paged = app.get("/api/notebooks?search=9&page_size=1").await;
    assert_eq!(paged.body["count_objects"], 2);
    assert_eq!(
        paged.body["next_item"],
        "http://localhost:3000/api/notebooks?page=2&page_size=1&search=9"
    );
}

#[tokio::test]
async fn test_customers_are_paginated() {
    let app = TestApp::new();
    let empty = app.get("/api/customers").await;
    assert_eq!(empty.status, StatusCode::OK);
    assert_eq!(empty.body["count_objects"], 0);
    assert_eq!(empty.body["items"], serde_json::json!([]));
}
