use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;

use crate::app::auth::AuthService;
use crate::http::AppError;
use crate::AppState;

/// Verified bearer identity. Handlers that accept anonymous callers take
/// `Option<AuthUser>` instead.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i64,
    pub username: String,
    pub role: String,
}

impl AuthUser {
    pub fn is_bidder(&self) -> bool {
        self.role == "bidder"
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("Authentication required"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::unauthorized("Authentication required"))?;

        let service = AuthService::new(
            state.store.clone(),
            state.token_key,
            state.token_ttl_hours,
        );
        let identity = service
            .verify(token)
            .map_err(|_| AppError::internal("failed to verify token"))?
            .ok_or_else(|| AppError::unauthorized("Invalid or expired token"))?;

        Ok(AuthUser {
            user_id: identity.user_id,
            username: identity.username,
            role: identity.role,
        })
    }
}
