//! 组局路由

use axum::Json;
use axum::extract::{Path, State};
use promptplay_common::GameId;
use promptplay_errors::AppResult;

use crate::api::http::AppState;
use crate::api::http::dto::{
    GameRequestResponse, MatchResultResponse, MessageResponse, PromptRequest, RootResponse,
};
use crate::api::http::extractors::{ApiJson, CurrentUser};
use crate::domain::GameView;

fn to_responses(views: Vec<GameView>) -> Json<Vec<GameRequestResponse>> {
    Json(views.into_iter().map(Into::into).collect())
}

/// GET /
pub async fn root(State(state): State<AppState>) -> AppResult<Json<RootResponse>> {
    let stats = state.games.stats().await?;
    Ok(Json(stats.into()))
}

/// GET /requests
pub async fn list_requests(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<GameRequestResponse>>> {
    Ok(to_responses(state.games.list_all().await?))
}

/// POST /create-request
pub async fn create_request(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(body): ApiJson<PromptRequest>,
) -> AppResult<Json<GameRequestResponse>> {
    let view = state.games.create_from_prompt(&user, &body.prompt).await?;
    Ok(Json(view.into()))
}

/// POST /find-match
pub async fn find_match(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<PromptRequest>,
) -> AppResult<Json<Vec<MatchResultResponse>>> {
    let matches = state.games.find_matches(&body.prompt).await?;
    Ok(Json(matches.into_iter().map(Into::into).collect()))
}

/// DELETE /requests/{id}
pub async fn delete_request(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    state.games.delete(&user, GameId::parse(&id)).await?;
    Ok(Json(MessageResponse::new("Request deleted successfully")))
}

/// GET /my-games/hosted
pub async fn hosted(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Vec<GameRequestResponse>>> {
    Ok(to_responses(state.games.hosted_by(&user).await?))
}

/// GET /my-games/joined
pub async fn joined(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Vec<GameRequestResponse>>> {
    Ok(to_responses(state.games.joined_by(&user).await?))
}
