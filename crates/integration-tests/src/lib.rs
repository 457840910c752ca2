//! Integration tests for Gadget Shop.
//!
//! The storefront router is driven in-process with
//! [`tower::ServiceExt::oneshot`], over a catalog built from
//! `fixtures/catalog.yaml` and without a database.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p gadget-shop-integration-tests
//! ```
//!
//! # Fixture catalog
//!
//! | id | slug            | type       | price   |
//! |----|-----------------|------------|---------|
//! | 1  | alpha-phone     | smartphone | 599.99  |
//! | 2  | beta-phone-pro  | smartphone | 899.00  |
//! | 3  | gamma-lite      | smartphone | 199.50  |
//! | 4  | air-13          | notebook   | 999.00  |
//! | 5  | work-15-pro     | notebook   | 1499.99 |

#![cfg_attr(not(test), forbid(unsafe_code))]

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode},
};
use serde_json::Value;
use tower::ServiceExt;

use gadget_shop_storefront::{app, config::StorefrontConfig, seed::CatalogSeed, state::AppState};

pub use gadget_shop_storefront::middleware::auth::{CART_ID_HEADER, USER_ID_HEADER};

/// The fixture seed document.
pub const CATALOG_YAML: &str = include_str!("../fixtures/catalog.yaml");

/// A response with its body parsed as JSON (`Value::Null` when empty).
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    /// The guest cart token from the `x-cart-id` header, if present.
    #[must_use]
    pub fn cart_token(&self) -> Option<String> {
        self.headers
            .get(CART_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(String::from)
    }
}

/// An in-process storefront over the fixture catalog.
pub struct TestApp {
    router: Router,
}

impl TestApp {
    /// Build a fresh storefront; every call starts from an empty shop.
    ///
    /// # Panics
    ///
    /// Panics if the fixture catalog is invalid.
    #[must_use]
    pub fn new() -> Self {
        let catalog = CatalogSeed::from_yaml(CATALOG_YAML)
            .and_then(CatalogSeed::build)
            .expect("fixture catalog is valid");
        let state = AppState::new(StorefrontConfig::default(), catalog, None);
        Self { router: app(state) }
    }

    /// Send a request. `headers` are added as given; a `body` is sent as
    /// JSON.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built or the body is not JSON.
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        headers: &[(&str, &str)],
        body: Option<Value>,
    ) -> TestResponse {
        let mut request = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        let request = match body {
            Some(json) => request
                .header("content-type", "application/json")
                .body(Body::from(json.to_string())),
            None => request.body(Body::empty()),
        }
        .expect("request is valid");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body is readable");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// `GET` without identity headers.
    pub async fn get(&self, uri: &str) -> TestResponse {
        self.send(Method::GET, uri, &[], None).await
    }

    /// `POST` a JSON body without identity headers.
    pub async fn post(&self, uri: &str, body: Value) -> TestResponse {
        self.send(Method::POST, uri, &[], Some(body)).await
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

/// Shipping details that pass validation.
#[must_use]
pub fn shipping() -> Value {
    serde_json::json!({
        "first_name": "Grace",
        "last_name": "Hopper",
        "phone": "15550001234",
        "buying_type": "pickup"
    })
}
