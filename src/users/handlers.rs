use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use std::sync::Arc;

use crate::auth::AuthenticatedUser;
use crate::shared::error::AppError;
use crate::shared::state::AppState;
use crate::users::types::{
    AccessToken, LoggedTimeResponse, RefreshRequest, RegisterRequest, RegisterResponse, TokenPair,
    TokenRequest, UserListItem,
};

pub async fn handle_register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    let registered = state.accounts.register(payload).await?;
    Ok((StatusCode::CREATED, Json(registered)))
}

pub async fn handle_token_obtain(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<TokenRequest>,
) -> Result<Json<TokenPair>, AppError> {
    Ok(Json(state.accounts.obtain_tokens(payload).await?))
}

pub async fn handle_token_refresh(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<AccessToken>, AppError> {
    Ok(Json(state.accounts.refresh(&payload.refresh).await?))
}

pub async fn handle_user_list(
    State(state): State<Arc<AppState>>,
    _user: AuthenticatedUser,
) -> Result<Json<Vec<UserListItem>>, AppError> {
    let users = state.store.list_users().await?;
    Ok(Json(
        users
            .iter()
            .map(|user| UserListItem {
                id: user.id,
                full_name: user.full_name(),
            })
            .collect(),
    ))
}

pub async fn handle_logged_time_last_month(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
) -> Result<Json<LoggedTimeResponse>, AppError> {
    let total_minutes = state
        .aggregation
        .user_logged_minutes_last_month(user.user_id, Utc::now())
        .await?;
    Ok(Json(LoggedTimeResponse { total_minutes }))
}

pub fn configure_users_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users", get(handle_user_list))
        .route("/users/register", post(handle_register))
        .route("/users/token", post(handle_token_obtain))
        .route("/users/token/refresh", post(handle_token_refresh))
        .route(
            "/users/logged-time/last-month",
            get(handle_logged_time_last_month),
        )
}
