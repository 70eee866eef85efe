//! Authentication Tests
//!
//! Covers login for both account realms, uniform failure behavior, and
//! protected route authorization.

mod common;

use axum::http::StatusCode;
use common::{app, ADMIN_PASSWORD, ADMIN_USERNAME, BIDDER_PASSWORD, BIDDER_USERNAME};
use serde_json::json;

#[tokio::test]
async fn login_seeded_admin() {
    let app = app().await;

    let resp = app
        .post_json(
            "/api/auth/login",
            json!({ "username": ADMIN_USERNAME, "password": ADMIN_PASSWORD }),
            None,
        )
        .await;

    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    assert!(body["token"].is_string());
    assert_eq!(body["user"]["username"], "admin");
    assert_eq!(body["user"]["role"], "admin");
    assert!(body["user"].get("password_hash").is_none());
    assert!(body["user"].get("passwordHash").is_none());
}

#[tokio::test]
async fn login_seeded_bidder() {
    let app = app().await;

    let resp = app
        .post_json(
            "/api/auth/login",
            json!({ "username": BIDDER_USERNAME, "password": BIDDER_PASSWORD }),
            None,
        )
        .await;

    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["user"]["role"], "bidder");
}

#[tokio::test]
async fn login_wrong_password() {
    let app = app().await;

    let resp = app
        .post_json(
            "/api/auth/login",
            json!({ "username": ADMIN_USERNAME, "password": "wrong" }),
            None,
        )
        .await;

    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(resp.error_message(), "Invalid login credentials");
}

#[tokio::test]
async fn login_unknown_user_has_same_message() {
    let app = app().await;

    let resp = app
        .post_json(
            "/api/auth/login",
            json!({ "username": "nobody", "password": "whatever" }),
            None,
        )
        .await;

    // Same status and message as a wrong password, no account enumeration.
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(resp.error_message(), "Invalid login credentials");
}

#[tokio::test]
async fn login_empty_fields() {
    let app = app().await;

    let resp = app
        .post_json(
            "/api/auth/login",
            json!({ "username": "", "password": "" }),
            None,
        )
        .await;

    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_message(), "Username and password are required");
}

#[tokio::test]
async fn me_returns_token_claims() {
    let app = app().await;
    let token = app.admin_token().await;

    let resp = app.get("/api/auth/me", Some(&token)).await;
    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    assert_eq!(body["username"], "admin");
    assert_eq!(body["role"], "admin");
    assert!(body["id"].is_i64());
}

#[tokio::test]
async fn protected_route_without_token() {
    let app = app().await;

    let resp = app.get("/api/admin/dashboard", None).await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(resp.error_message(), "Authentication required");
}

#[tokio::test]
async fn protected_route_with_garbage_token() {
    let app = app().await;

    let resp = app.get("/api/admin/dashboard", Some("not-a-token")).await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(resp.error_message(), "Invalid or expired token");
}

#[tokio::test]
async fn bidder_cannot_use_admin_routes() {
    let app = app().await;
    let token = app.bidder_token().await;

    let resp = app.get("/api/admin/users", Some(&token)).await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);
}
