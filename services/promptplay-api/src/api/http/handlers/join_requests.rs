//! 加入申请路由

use axum::Json;
use axum::extract::{Path, State};
use promptplay_common::{GameId, JoinRequestId};
use promptplay_errors::{AppError, AppResult};

use crate::api::http::AppState;
use crate::api::http::dto::{JoinGameRequest, JoinRequestResponse, UpdateJoinRequest};
use crate::api::http::extractors::{ApiJson, CurrentUser};

/// POST /games/{id}/join
pub async fn join_game(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<JoinGameRequest>,
) -> AppResult<Json<JoinRequestResponse>> {
    let view = state
        .join_requests
        .request_to_join(&user, GameId::parse(&id), body.description)
        .await?;
    Ok(Json(view.into()))
}

/// GET /games/{id}/join-requests
pub async fn list_join_requests(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<Vec<JoinRequestResponse>>> {
    let views = state
        .join_requests
        .list_for_game(&user, GameId::parse(&id))
        .await?;
    Ok(Json(views.into_iter().map(Into::into).collect()))
}

/// PUT /join-requests/{id}
pub async fn update_join_request(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<UpdateJoinRequest>,
) -> AppResult<Json<JoinRequestResponse>> {
    let request_id = id
        .parse::<i64>()
        .map(JoinRequestId)
        .map_err(|_| AppError::not_found("Join request not found"))?;

    let view = state
        .join_requests
        .decide(&user, request_id, &body.status)
        .await?;
    Ok(Json(view.into()))
}
