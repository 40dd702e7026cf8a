//! 请求/响应 DTO

use chrono::{DateTime, Utc};
use promptplay_common::{GameId, JoinRequestId, UserId};
use serde::{Deserialize, Serialize};

use crate::application::{AuthSession, Stats};
use crate::domain::services::GameMatch;
use crate::domain::{GameStatus, GameView, JoinRequestView, JoinStatus, User};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub is_guest: bool,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct PromptRequest {
    pub prompt: String,
}

/// 加入申请；路径中的组局 ID 为准，请求体里的 `game_id` 被忽略
#[derive(Debug, Default, Deserialize)]
pub struct JoinGameRequest {
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateJoinRequest {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: UserId,
    pub username: String,
    pub email: Option<String>,
    pub is_guest: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            is_guest: user.is_guest,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub user: UserResponse,
}

impl From<AuthSession> for TokenResponse {
    fn from(session: AuthSession) -> Self {
        Self {
            access_token: session.access_token,
            token_type: "bearer",
            user: session.user.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GameRequestResponse {
    pub id: GameId,
    pub host_id: UserId,
    pub host_username: String,
    pub original_prompt: String,
    pub sport: String,
    pub location: String,
    pub datetime_utc: DateTime<Utc>,
    pub players_needed: i32,
    pub players_joined: i64,
    pub status: GameStatus,
    pub created_at: DateTime<Utc>,
}

impl From<GameView> for GameRequestResponse {
    fn from(view: GameView) -> Self {
        let game = view.game;
        Self {
            id: game.id,
            host_id: game.host_id,
            host_username: view.host_username,
            original_prompt: game.original_prompt,
            sport: game.sport,
            location: game.location,
            datetime_utc: game.datetime_utc,
            players_needed: game.players_needed,
            players_joined: view.players_joined,
            status: game.status,
            created_at: game.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MatchResultResponse {
    pub game_request: GameRequestResponse,
    pub is_match: bool,
    pub compatibility_score: u8,
    pub reason: String,
}

impl From<GameMatch> for MatchResultResponse {
    fn from(m: GameMatch) -> Self {
        Self {
            game_request: m.game.into(),
            is_match: true,
            compatibility_score: m.compatibility_score,
            reason: m.reason,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct JoinRequestResponse {
    pub id: JoinRequestId,
    pub game_id: GameId,
    pub user_id: UserId,
    pub username: String,
    pub description: Option<String>,
    pub status: JoinStatus,
    pub created_at: DateTime<Utc>,
}

impl From<JoinRequestView> for JoinRequestResponse {
    fn from(view: JoinRequestView) -> Self {
        let request = view.request;
        Self {
            id: request.id,
            game_id: request.game_id,
            user_id: request.user_id,
            username: view.username,
            description: request.description,
            status: request.status,
            created_at: request.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub message: &'static str,
    pub total_requests: i64,
    pub total_users: i64,
}

impl From<Stats> for RootResponse {
    fn from(stats: Stats) -> Self {
        Self {
            message: "PromptPlay API is running",
            total_requests: stats.total_requests,
            total_users: stats.total_users,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct CheckResponse {
    pub name: String,
    pub healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub checks: Vec<CheckResponse>,
}
