//! 通用类型定义

use derive_more::{Display, From};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 用户 ID（数据库自增）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, From)]
#[serde(transparent)]
#[display("{_0}")]
pub struct UserId(pub i64);

impl UserId {
    pub fn value(&self) -> i64 {
        self.0
    }
}

/// 组局请求 ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From)]
#[serde(transparent)]
#[display("{_0}")]
pub struct GameId(pub Uuid);

impl GameId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// 路径参数中的非法 UUID 视为不存在的组局，而不是请求格式错误
    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }
}

impl Default for GameId {
    fn default() -> Self {
        Self::new()
    }
}

/// 加入申请 ID（数据库自增）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From)]
#[serde(transparent)]
#[display("{_0}")]
pub struct JoinRequestId(pub i64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_serialize_transparently() {
        assert_eq!(serde_json::to_string(&UserId(7)).unwrap(), "7");
        assert_eq!(serde_json::to_string(&JoinRequestId(3)).unwrap(), "3");

        let game_id = GameId::new();
        assert_eq!(
            serde_json::to_string(&game_id).unwrap(),
            format!("\"{}\"", game_id.0)
        );
    }

    #[test]
    fn test_game_id_parse() {
        let game_id = GameId::new();
        assert_eq!(GameId::parse(&game_id.to_string()), Some(game_id));
        assert_eq!(GameId::parse("game123"), None);
    }
}
