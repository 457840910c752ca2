//! Catalog API: categories, features, filters and product detail.

#![allow(clippy::unwrap_used)]

use axum::http::{Method, StatusCode};
use serde_json::{Value, json};

use gadget_shop_integration_tests::TestApp;

#[tokio::test]
async fn test_health() {
    let app = TestApp::new();
    let response = app.get("/health").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, "ok");
    assert!(response.headers.contains_key("x-request-id"));

    // No database configured
    assert_eq!(app.get("/health/ready").await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_category_list_and_detail() {
    let app = TestApp::new();

    let list = app.get("/api/categories").await;
    assert_eq!(list.status, StatusCode::OK);
    assert_eq!(list.body["count_objects"], 2);
    assert_eq!(list.body["items"][0]["slug"], "smartphones");
    assert_eq!(list.body["items"][0]["url"], "/category/smartphones/");
    assert!(list.body["next_item"].is_null());

    let detail = app.get("/api/categories/2").await;
    assert_eq!(detail.status, StatusCode::OK);
    assert_eq!(detail.body["name"], "Notebooks");

    let missing = app.get("/api/categories/99").await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert_eq!(missing.body["error"], "not_found");
}

#[tokio::test]
async fn test_create_and_update_category() {
    let app = TestApp::new();

    let created = app
        .post("/api/categories", json!({"name": "Tablets", "slug": "tablets"}))
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.body["id"], 3);

    let duplicate = app
        .post("/api/categories", json!({"name": "Tabs", "slug": "tablets"}))
        .await;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);
    assert_eq!(duplicate.body["error"], "integrity");

    let bad_slug = app
        .post("/api/categories", json!({"name": "Watches", "slug": "smart watches"}))
        .await;
    assert_eq!(bad_slug.status, StatusCode::BAD_REQUEST);
    assert_eq!(bad_slug.body["error"], "validation");

    let updated = app
        .send(
            Method::PUT,
            "/api/categories/3",
            &[],
            Some(json!({"name": "Tablets & e-readers", "slug": "tablets"})),
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.body["name"], "Tablets & e-readers");

    let malformed = app.post("/api/categories", json!({"name": "No slug"})).await;
    assert_eq!(malformed.status, StatusCode::BAD_REQUEST);
    assert_eq!(malformed.body["error"], "bad_request");
}

#[tokio::test]
async fn test_filterable_features() {
    let app = TestApp::new();

    let response = app.get("/api/categories/smartphones/filters").await;
    assert_eq!(response.status, StatusCode::OK);
    let filters = response.body.as_array().unwrap();
    // main_camera_mp is not used in filters
    assert_eq!(filters.len(), 2);
    assert_eq!(filters[0]["key"], "ram");
    assert_eq!(filters[0]["kind"], "checkbox");
    assert_eq!(filters[0]["postfix"], "GB");
    assert_eq!(filters[0]["allowed_values"], json!(["6", "8", "12"]));
    assert_eq!(filters[1]["key"], "display");
    assert_eq!(filters[1]["kind"], "radio");
    assert_eq!(filters[1]["allowed_values"], json!([]));

    let created = app
        .post("/api/categories", json!({"name": "Tablets", "slug": "tablets"}))
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
    let empty = app.get("/api/categories/tablets/filters").await;
    assert_eq!(empty.status, StatusCode::OK);
    assert_eq!(empty.body, json!([]));

    let unknown = app.get("/api/categories/watches/filters").await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);
}

fn slugs(body: &Value) -> Vec<&str> {
    body.as_array()
        .unwrap()
        .iter()
        .map(|p| p["slug"].as_str().unwrap())
        .collect()
}

#[tokio::test]
async fn test_category_products_filtering() {
    let app = TestApp::new();

    let all = app.get("/api/categories/smartphones/products").await;
    assert_eq!(all.status, StatusCode::OK);
    assert_eq!(
        slugs(&all.body),
        vec!["alpha-phone", "beta-phone-pro", "gamma-lite"]
    );

    let ram = app
        .get("/api/categories/smartphones/products?ram=8&ram=12")
        .await;
    assert_eq!(ram.status, StatusCode::OK);
    assert_eq!(slugs(&ram.body), vec!["alpha-phone", "beta-phone-pro"]);

    let combined = app
        .get("/api/categories/smartphones/products?ram=8&ram=12&display=OLED")
        .await;
    assert_eq!(slugs(&combined.body), vec!["alpha-phone", "beta-phone-pro"]);

    let lcd = app
        .get("/api/categories/smartphones/products?display=LCD")
        .await;
    assert_eq!(slugs(&lcd.body), vec!["gamma-lite"]);
}

#[tokio::test]
async fn test_category_products_rejected_filters() {
    let app = TestApp::new();

    // Radio filter takes one value
    let radio = app
        .get("/api/categories/smartphones/products?display=OLED&display=LCD")
        .await;
    assert_eq!(radio.status, StatusCode::BAD_REQUEST);
    assert_eq!(radio.body["error"], "validation");

    // Not one of the allowed values
    let value = app.get("/api/categories/smartphones/products?ram=7").await;
    assert_eq!(value.status, StatusCode::BAD_REQUEST);

    // Not a filter of the category
    let key = app
        .get("/api/categories/smartphones/products?main_camera_mp=48")
        .await;
    assert_eq!(key.status, StatusCode::BAD_REQUEST);

    let unknown = app.get("/api/categories/watches/products").await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_product_detail_by_variant() {
    let app = TestApp::new();

    let phone = app.get("/api/smartphones/1").await;
    assert_eq!(phone.status, StatusCode::OK);
    assert_eq!(phone.body["type"], "smartphone");
    assert_eq!(phone.body["price"], "599.99");
    assert_eq!(phone.body["battery_capacity"], "4000 mAh");
    assert_eq!(phone.body["removable_storage"], false);
    assert_eq!(phone.body["url"], "/products/alpha-phone/");

    // A notebook id is not a smartphone
    assert_eq!(
        app.get("/api/smartphones/4").await.status,
        StatusCode::NOT_FOUND
    );

    let notebook = app.get("/api/notebooks/4").await;
    assert_eq!(notebook.status, StatusCode::OK);
    assert_eq!(notebook.body["type"], "notebook");
    assert_eq!(notebook.body["video_chipset"], "Integrated");
    assert!(notebook.body.get("battery_capacity").is_none());

    let by_slug = app.get("/api/products/work-15-pro").await;
    assert_eq!(by_slug.status, StatusCode::OK);
    assert_eq!(by_slug.body["id"], 5);
    assert_eq!(by_slug.body["price"], "1499.99");

    assert_eq!(
        app.get("/api/products/nothing-here").await.status,
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn test_create_product() {
    let app = TestApp::new();

    let notebook = json!({
        "category_id": 2,
        "type": "notebook",
        "title": "Mini 11",
        "slug": "mini-11",
        "image": "mini-11.jpg",
        "price": "349.90",
        "diagonal": "11.6",
        "display": "TN",
        "processor_frequency": "1.1",
        "ram": "4",
        "video_chipset": "Integrated",
        "battery_life": "10"
    });
    let created = app.post("/api/products", notebook.clone()).await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.body["id"], 6);
    assert_eq!(created.body["price"], "349.90");

    let listed = app.get("/api/notebooks").await;
    assert_eq!(listed.body["count_objects"], 3);

    let taken = app.post("/api/products", notebook.clone()).await;
    assert_eq!(taken.status, StatusCode::CONFLICT);

    let mut untitled = notebook.clone();
    untitled["slug"] = json!("mini-12");
    untitled.as_object_mut().unwrap().remove("title");
    let missing = app.post("/api/products", untitled).await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);
    assert_eq!(missing.body["error"], "validation");
    assert!(missing.body["message"].as_str().unwrap().contains("title"));

    let mut negative = notebook;
    negative["slug"] = json!("mini-13");
    negative["price"] = json!("-1.00");
    let rejected = app.post("/api/products", negative).await;
    assert_eq!(rejected.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_feature_and_validator() {
    let app = TestApp::new();

    let feature = app
        .post(
            "/api/features",
            json!({
                "category_id": 2,
                "key": "display",
                "name": "Display",
                "use_in_filter": true,
                "filter_kind": "radio"
            }),
        )
        .await;
    assert_eq!(feature.status, StatusCode::CREATED);
    let feature_id = feature.body["id"].clone();

    let duplicate_key = app
        .post(
            "/api/features",
            json!({"category_id": 2, "key": "display", "name": "Screen"}),
        )
        .await;
    assert_eq!(duplicate_key.status, StatusCode::CONFLICT);

    let validator = app
        .post(
            "/api/validators",
            json!({"category_id": 2, "feature_id": feature_id, "value": "IPS"}),
        )
        .await;
    assert_eq!(validator.status, StatusCode::CREATED);

    // Values are unique across all categories
    let reused = app
        .post(
            "/api/validators",
            json!({"category_id": 1, "value": "8"}),
        )
        .await;
    assert_eq!(reused.status, StatusCode::CONFLICT);

    let filters = app.get("/api/categories/notebooks/filters").await;
    assert_eq!(filters.body[1]["key"], "display");
    assert_eq!(filters.body[1]["allowed_values"], json!(["IPS"]));

    let ips = app
        .get("/api/categories/notebooks/products?display=IPS")
        .await;
    assert_eq!(ips.body.as_array().unwrap().len(), 2);
}
