#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use hive::app::seed;
use hive::store::memory::MemStore;
use hive::store::Store;
use hive::AppState;

// 32 bytes, test-only signing key
const TEST_TOKEN_KEY: [u8; 32] = *b"0123456789abcdef0123456789abcdef";

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "admin";
pub const BIDDER_USERNAME: &str = "sxulsh";
pub const BIDDER_PASSWORD: &str = "password123";

pub struct TestApp {
    router: Router,
    pub store: Arc<dyn Store>,
}

pub struct TestResponse {
    pub status: StatusCode,
    body_bytes: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body_bytes).unwrap_or(Value::Null)
    }

    pub fn error_message(&self) -> String {
        self.json()["message"].as_str().unwrap_or("").to_string()
    }
}

/// Fresh app on an in-memory store, seeded with the demo fixtures. Each test
/// gets its own instance so state never leaks across tests.
pub async fn app() -> TestApp {
    let store: Arc<dyn Store> = Arc::new(MemStore::new());
    seed::apply(store.as_ref())
        .await
        .expect("seeding test store failed");

    let state = AppState {
        store: store.clone(),
        token_key: TEST_TOKEN_KEY,
        token_ttl_hours: 24,
        mapbox_token: Some("pk.test-token".into()),
        aggregation_timeout: Duration::from_secs(5),
    };
    let router = hive::http::router(state);

    TestApp { router, store }
}

impl TestApp {
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header("host", "localhost");

        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }

        let request = if let Some(body) = body {
            builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_string(&body).unwrap()))
                .unwrap()
        } else {
            builder.body(Body::empty()).unwrap()
        };

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("oneshot failed");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("failed to collect body")
            .to_bytes()
            .to_vec();

        TestResponse { status, body_bytes }
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::GET, path, None, token).await
    }

    pub async fn post_json(&self, path: &str, body: Value, token: Option<&str>) -> TestResponse {
        self.request(Method::POST, path, Some(body), token).await
    }

    /// Posts a raw body with a json content type, for malformed-payload tests.
    pub async fn post_raw(&self, path: &str, body: &str) -> TestResponse {
        let request = Request::builder()
            .method(Method::POST)
            .uri(path)
            .header("host", "localhost")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("oneshot failed");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("failed to collect body")
            .to_bytes()
            .to_vec();

        TestResponse { status, body_bytes }
    }

    /// Logs in through the API and returns the bearer token.
    pub async fn login(&self, username: &str, password: &str) -> String {
        let resp = self
            .post_json(
                "/api/auth/login",
                json!({ "username": username, "password": password }),
                None,
            )
            .await;
        assert_eq!(resp.status, StatusCode::OK, "login failed: {}", resp.error_message());
        resp.json()["token"]
            .as_str()
            .expect("login response missing token")
            .to_string()
    }

    pub async fn admin_token(&self) -> String {
        self.login(ADMIN_USERNAME, ADMIN_PASSWORD).await
    }

    pub async fn bidder_token(&self) -> String {
        self.login(BIDDER_USERNAME, BIDDER_PASSWORD).await
    }
}
