use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::app::auth::{AuthService, LoginUser};
use crate::app::bidder::{BidderDashboard, BidderService};
use crate::app::chat::ChatService;
use crate::app::dashboard::{AdminDashboard, DashboardService, FinanceReport, SystemHealth};
use crate::domain::admin_user::AdminUser;
use crate::domain::chat::ChatMessage;
use crate::domain::ticket::{SupportTicket, TicketStatus};
use crate::http::{AppError, AppJson, AuthUser};
use crate::AppState;

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
}

pub(crate) async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = if state.store.ping().await.is_ok() {
        "ok"
    } else {
        "degraded"
    };
    Json(HealthResponse { status })
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: LoginUser,
}

pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    if payload.username.trim().is_empty() || payload.password.is_empty() {
        return Err(AppError::bad_request("Username and password are required"));
    }

    let service = AuthService::new(
        state.store.clone(),
        state.token_key,
        state.token_ttl_hours,
    );
    let grant = service
        .login(&payload.username, &payload.password)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to login");
            AppError::internal("failed to login")
        })?
        .ok_or_else(|| AppError::unauthorized("Invalid login credentials"))?;

    Ok(Json(LoginResponse {
        token: grant.token,
        user: grant.user,
    }))
}

#[derive(Serialize)]
pub struct IdentityResponse {
    pub id: i64,
    pub username: String,
    pub role: String,
}

pub async fn current_user(user: AuthUser) -> Json<IdentityResponse> {
    Json(IdentityResponse {
        id: user.user_id,
        username: user.username,
        role: user.role,
    })
}

fn require_admin(user: &AuthUser) -> Result<(), AppError> {
    if user.is_bidder() {
        return Err(AppError::forbidden("Administrator account required"));
    }
    Ok(())
}

pub async fn admin_dashboard(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<AdminDashboard>, AppError> {
    require_admin(&user)?;
    let service = DashboardService::new(state.store.clone(), state.aggregation_timeout);
    Ok(Json(service.admin_dashboard().await?))
}

#[derive(Serialize)]
pub struct UsersResponse {
    pub users: Vec<AdminUser>,
}

pub async fn list_users(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<UsersResponse>, AppError> {
    require_admin(&user)?;
    let users = state.store.list_admin_users().await?;
    Ok(Json(UsersResponse { users }))
}

#[derive(Serialize)]
pub struct UserResponse {
    pub user: AdminUser,
}

pub async fn get_user(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<UserResponse>, AppError> {
    require_admin(&user)?;
    let found = state
        .store
        .get_admin_user(id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    Ok(Json(UserResponse { user: found }))
}

pub async fn admin_health(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<SystemHealth>, AppError> {
    require_admin(&user)?;
    let service = DashboardService::new(state.store.clone(), state.aggregation_timeout);
    Ok(Json(service.system_health().await?))
}

#[derive(Deserialize)]
pub struct TicketQuery {
    pub status: Option<String>,
}

#[derive(Serialize)]
pub struct TicketsResponse {
    pub tickets: Vec<SupportTicket>,
}

pub async fn admin_tickets(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<TicketQuery>,
) -> Result<Json<TicketsResponse>, AppError> {
    require_admin(&user)?;
    let status = match query.status.as_deref() {
        Some(raw) => Some(
            raw.parse::<TicketStatus>()
                .map_err(|err| AppError::bad_request(err.to_string()))?,
        ),
        None => None,
    };
    let tickets = state.store.list_tickets(status).await?;
    Ok(Json(TicketsResponse { tickets }))
}

pub async fn admin_finance(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<FinanceReport>, AppError> {
    require_admin(&user)?;
    let service = DashboardService::new(state.store.clone(), state.aggregation_timeout);
    Ok(Json(service.finance().await?))
}

#[derive(Serialize)]
pub struct ModuleSummary {
    pub id: &'static str,
    pub name: &'static str,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub records: Option<usize>,
}

#[derive(Serialize)]
pub struct ModulesResponse {
    pub modules: Vec<ModuleSummary>,
}

/// Static platform catalog; record counts come from the store where an
/// entity backs the module.
pub async fn modules_summary(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<ModulesResponse>, AppError> {
    require_admin(&user)?;
    let tender_count = state.store.list_tenders().await?.len();
    let modules = vec![
        ModuleSummary {
            id: "bidder",
            name: "Bidder",
            status: "active",
            records: None,
        },
        ModuleSummary {
            id: "bee",
            name: "Worker Bee",
            status: "beta",
            records: None,
        },
        ModuleSummary {
            id: "courier",
            name: "Courier",
            status: "planned",
            records: None,
        },
        ModuleSummary {
            id: "tenderer",
            name: "Tenderer",
            status: "active",
            records: Some(tender_count),
        },
        ModuleSummary {
            id: "supplier",
            name: "Supplier",
            status: "active",
            records: None,
        },
        ModuleSummary {
            id: "drone",
            name: "Drone Ops",
            status: "planned",
            records: None,
        },
    ];
    Ok(Json(ModulesResponse { modules }))
}

pub async fn bidder_dashboard(
    State(state): State<AppState>,
    user: Option<AuthUser>,
) -> Result<Json<BidderDashboard>, AppError> {
    let bidder_id = user.filter(AuthUser::is_bidder).map(|u| u.user_id);
    let service = BidderService::new(
        state.store.clone(),
        state.mapbox_token.clone(),
        state.aggregation_timeout,
    );
    Ok(Json(service.dashboard(bidder_id).await?))
}

#[derive(Deserialize)]
pub struct ChatRequest {
    pub message: Option<String>,
}

#[derive(Serialize)]
pub struct ChatResponse {
    pub reply: String,
}

pub async fn post_chat_message(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    AppJson(payload): AppJson<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let message = payload
        .message
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .ok_or_else(|| AppError::bad_request("Invalid message format"))?;

    let bidder_id = user.filter(AuthUser::is_bidder).map(|u| u.user_id);
    let service = ChatService::new(state.store.clone());
    let exchange = service.post_message(bidder_id, message).await?;
    Ok(Json(ChatResponse {
        reply: exchange.reply,
    }))
}

#[derive(Serialize)]
pub struct ChatHistoryResponse {
    pub messages: Vec<ChatMessage>,
}

pub async fn chat_history(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<ChatHistoryResponse>, AppError> {
    if !user.is_bidder() {
        return Err(AppError::forbidden("Bidder account required"));
    }
    let service = ChatService::new(state.store.clone());
    let messages = service.history(user.user_id).await?;
    Ok(Json(ChatHistoryResponse { messages }))
}
