use axum::Router;

use crate::AppState;

mod auth;
mod error;
mod handlers;
mod json;
mod routes;

pub use auth::AuthUser;
pub use error::AppError;
pub use json::AppJson;

pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(routes::health())
        .merge(routes::auth())
        .merge(routes::admin())
        .merge(routes::bidder())
        .merge(routes::chat())
        .with_state(state)
}
