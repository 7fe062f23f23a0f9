//! Integration tests for the Moo Deng storefront.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p moodeng-integration-tests
//! ```
//!
//! The tests drive the full storefront router in-process, with the embedded
//! catalog, no checkout delay and a [`RecordingSink`] in place of the Meta
//! pixel. No server or network is needed.
//!
//! # Test Categories
//!
//! - `storefront_shop` - Catalog browsing and the shop filter
//! - `storefront_cart` - Cart operations across requests
//! - `storefront_wishlist` - Wishlist operations
//! - `storefront_checkout` - Simulated checkout flow and analytics

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, Response, StatusCode, header};
use moodeng_core::analytics::RecordingSink;
use moodeng_storefront::catalog::load_catalog;
use moodeng_storefront::config::StorefrontConfig;
use moodeng_storefront::middleware::SESSION_COOKIE_NAME;
use moodeng_storefront::state::AppState;
use rust_decimal::Decimal;
use serde_json::Value;
use tower::ServiceExt;

/// Largest response body the helpers will read.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// One visitor talking to an in-process storefront.
///
/// The session cookie from each response is sent back on the next request,
/// the way a browser would.
pub struct TestApp {
    router: Router,
    sink: Arc<RecordingSink>,
    cookie: Option<String>,
}

impl TestApp {
    /// Storefront with the embedded catalog and instant checkout.
    ///
    /// # Panics
    ///
    /// Panics if the embedded catalog fails to load.
    #[must_use]
    pub fn new() -> Self {
        Self::with_checkout_delay(Duration::ZERO)
    }

    /// Storefront whose checkout submission waits `delay`.
    ///
    /// # Panics
    ///
    /// Panics if the embedded catalog fails to load.
    #[must_use]
    pub fn with_checkout_delay(delay: Duration) -> Self {
        let config = StorefrontConfig {
            checkout_delay: delay,
            ..StorefrontConfig::default()
        };
        let catalog = load_catalog(None).expect("embedded catalog should load");
        let sink = Arc::new(RecordingSink::new());
        let state = AppState::new(config, catalog, sink.clone());

        Self {
            router: moodeng_storefront::app(state),
            sink,
            cookie: None,
        }
    }

    /// Events the storefront has reported so far.
    #[must_use]
    pub fn sink(&self) -> &RecordingSink {
        &self.sink
    }

    /// Forget the session cookie, as a new visitor.
    pub fn clear_cookie(&mut self) {
        self.cookie = None;
    }

    /// `GET` a path and return the status and JSON body.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built. A body that is not JSON comes
    /// back as a JSON string.
    pub async fn get(&mut self, path: &str) -> (StatusCode, Value) {
        let request = self
            .request("GET", path)
            .body(Body::empty())
            .expect("request should build");
        self.send(request).await
    }

    /// `POST` a JSON body and return the status and JSON body.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built.
    pub async fn post_json(&mut self, path: &str, body: &Value) -> (StatusCode, Value) {
        let request = self.json_request(path, body);
        self.send(request).await
    }

    /// `POST` several JSON bodies at once with the current session cookie.
    ///
    /// Each request runs on its own task. Results come back in input order.
    /// The session cookie is not updated, so call this after the session
    /// exists.
    ///
    /// # Panics
    ///
    /// Panics if a request cannot be built or a request task panics.
    pub async fn post_json_concurrently(
        &self,
        requests: &[(&str, Value)],
    ) -> Vec<(StatusCode, Value)> {
        let handles: Vec<_> = requests
            .iter()
            .map(|(path, body)| {
                let request = self.json_request(path, body);
                let router = self.router.clone();
                tokio::spawn(async move {
                    let response = router.oneshot(request).await.expect("router is infallible");
                    read_body(response).await
                })
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            results.push(handle.await.expect("request task should not panic"));
        }
        results
    }

    fn json_request(&self, path: &str, body: &Value) -> Request<Body> {
        self.request("POST", path)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request should build")
    }

    fn request(&self, method: &str, path: &str) -> axum::http::request::Builder {
        let builder = Request::builder().method(method).uri(path);
        match &self.cookie {
            Some(cookie) => builder.header(header::COOKIE, cookie),
            None => builder,
        }
    }

    async fn send(&mut self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        if let Some(cookie) = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(|v| v.split(';').next())
            .find(|v| v.starts_with(SESSION_COOKIE_NAME))
        {
            self.cookie = Some(cookie.to_string());
        }

        read_body(response).await
    }
}

async fn read_body(response: Response<Body>) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = to_bytes(response.into_body(), MAX_BODY_BYTES)
        .await
        .expect("body should be readable");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, body)
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

/// Read a decimal field that was serialized as a string.
///
/// # Panics
///
/// Panics if the value is not a decimal string.
#[must_use]
pub fn decimal(value: &Value) -> Decimal {
    let text = value.as_str().expect("decimal should be a string");
    Decimal::from_str(text).expect("decimal should parse")
}

/// Parse a decimal literal.
///
/// # Panics
///
/// Panics if `text` is not a decimal.
#[must_use]
pub fn dec(text: &str) -> Decimal {
    Decimal::from_str(text).expect("decimal literal should parse")
}

/// IDs of the products in a JSON array of product views.
#[must_use]
pub fn product_ids(products: &Value) -> Vec<String> {
    products
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|p| p["id"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
