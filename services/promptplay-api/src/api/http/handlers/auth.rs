//! 认证路由

use axum::Json;
use axum::extract::State;
use promptplay_errors::AppResult;

use crate::api::http::AppState;
use crate::api::http::dto::{LoginRequest, RegisterRequest, TokenResponse, UserResponse};
use crate::api::http::extractors::{ApiJson, CurrentUser};
use crate::application::RegisterCommand;

/// POST /auth/register
pub async fn register(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> AppResult<Json<TokenResponse>> {
    let session = state
        .auth
        .register(RegisterCommand {
            username: body.username,
            email: body.email,
            password: body.password,
            is_guest: body.is_guest,
        })
        .await?;

    Ok(Json(session.into()))
}

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> AppResult<Json<TokenResponse>> {
    let session = state.auth.login(&body.username, &body.password).await?;
    Ok(Json(session.into()))
}

/// POST /auth/guest
pub async fn guest(State(state): State<AppState>) -> AppResult<Json<TokenResponse>> {
    let session = state.auth.guest_login().await?;
    Ok(Json(session.into()))
}

/// GET /auth/me
pub async fn me(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    Json(user.into())
}
