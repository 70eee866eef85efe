use axum::{routing::get, routing::post, Router};

use crate::http::handlers;
use crate::AppState;

pub fn health() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health))
}

pub fn auth() -> Router<AppState> {
    Router::new()
        .route("/api/auth/login", post(handlers::login))
        .route("/api/auth/me", get(handlers::current_user))
}

pub fn admin() -> Router<AppState> {
    Router::new()
        .route("/api/admin/dashboard", get(handlers::admin_dashboard))
        .route("/api/admin/users", get(handlers::list_users))
        .route("/api/admin/users/:id", get(handlers::get_user))
        .route("/api/admin/health", get(handlers::admin_health))
        .route("/api/admin/tickets", get(handlers::admin_tickets))
        .route("/api/admin/finance", get(handlers::admin_finance))
        .route("/api/admin/modules/summary", get(handlers::modules_summary))
}

pub fn bidder() -> Router<AppState> {
    Router::new().route("/api/dashboard", get(handlers::bidder_dashboard))
}

pub fn chat() -> Router<AppState> {
    Router::new()
        .route("/api/chat", post(handlers::post_chat_message))
        .route("/api/chat/history", get(handlers::chat_history))
}
