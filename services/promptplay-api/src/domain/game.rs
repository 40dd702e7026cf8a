//! 组局请求

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use promptplay_common::{GameId, UserId};
use serde::{Deserialize, Serialize};

/// 组局状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    #[default]
    Open,
    Full,
    Cancelled,
}

impl GameStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Full => "full",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GameStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "full" => Ok(Self::Full),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(format!("Unknown game status: {}", other)),
        }
    }
}

/// 从自然语言中抽取出的组局信息
#[derive(Debug, Clone, PartialEq)]
pub struct GameDetails {
    pub sport: String,
    pub location: String,
    pub datetime_utc: DateTime<Utc>,
    /// 还需要的人数（不含发起人）
    pub players_needed: i32,
}

/// 组局请求
#[derive(Debug, Clone, PartialEq)]
pub struct GameRequest {
    pub id: GameId,
    pub host_id: UserId,
    pub original_prompt: String,
    pub sport: String,
    pub location: String,
    pub datetime_utc: DateTime<Utc>,
    pub players_needed: i32,
    pub status: GameStatus,
    pub created_at: DateTime<Utc>,
}

impl GameRequest {
    pub fn new(host_id: UserId, original_prompt: impl Into<String>, details: GameDetails) -> Self {
        Self {
            id: GameId::new(),
            host_id,
            original_prompt: original_prompt.into(),
            sport: details.sport,
            location: details.location,
            datetime_utc: details.datetime_utc,
            players_needed: details.players_needed,
            status: GameStatus::Open,
            created_at: Utc::now(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == GameStatus::Open
    }

    pub fn is_hosted_by(&self, user_id: UserId) -> bool {
        self.host_id == user_id
    }

    /// 已接受人数达到需求时组局满员
    pub fn is_filled_by(&self, accepted: i64) -> bool {
        accepted >= i64::from(self.players_needed)
    }
}

/// 组局读模型：附带发起人用户名和已接受人数
#[derive(Debug, Clone, PartialEq)]
pub struct GameView {
    pub game: GameRequest,
    pub host_username: String,
    pub players_joined: i64,
}

impl GameView {
    pub fn new(game: GameRequest, host_username: impl Into<String>, players_joined: i64) -> Self {
        Self {
            game,
            host_username: host_username.into(),
            players_joined,
        }
    }
}

/// 组局列表查询，结果按创建时间倒序
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameQuery {
    All,
    Open,
    HostedBy(UserId),
    /// 用户已被接受加入的组局
    JoinedBy(UserId),
}
