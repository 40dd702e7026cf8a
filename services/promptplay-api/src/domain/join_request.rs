//! 加入申请

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use promptplay_common::{GameId, JoinRequestId, UserId};
use serde::{Deserialize, Serialize};

/// 加入申请状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinStatus {
    #[default]
    Pending,
    Accepted,
    Rejected,
}

impl JoinStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for JoinStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JoinStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "rejected" => Ok(Self::Rejected),
            other => Err(format!("Unknown join request status: {}", other)),
        }
    }
}

/// 发起人对申请的处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinDecision {
    Accept,
    Reject,
}

impl JoinDecision {
    /// 只接受 `accepted` 和 `rejected`
    pub fn parse(status: &str) -> Option<Self> {
        match status {
            "accepted" => Some(Self::Accept),
            "rejected" => Some(Self::Reject),
            _ => None,
        }
    }

    pub fn status(&self) -> JoinStatus {
        match self {
            Self::Accept => JoinStatus::Accepted,
            Self::Reject => JoinStatus::Rejected,
        }
    }
}

/// 加入申请
#[derive(Debug, Clone, PartialEq)]
pub struct JoinRequest {
    pub id: JoinRequestId,
    pub game_id: GameId,
    pub user_id: UserId,
    pub description: Option<String>,
    pub status: JoinStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 待插入的加入申请
#[derive(Debug, Clone)]
pub struct NewJoinRequest {
    pub game_id: GameId,
    pub user_id: UserId,
    pub description: Option<String>,
}

/// 加入申请读模型：附带申请人用户名
#[derive(Debug, Clone, PartialEq)]
pub struct JoinRequestView {
    pub request: JoinRequest,
    pub username: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_parse() {
        assert_eq!(JoinDecision::parse("accepted"), Some(JoinDecision::Accept));
        assert_eq!(JoinDecision::parse("rejected"), Some(JoinDecision::Reject));
        assert_eq!(JoinDecision::parse("pending"), None);
        assert_eq!(JoinDecision::parse("Accepted"), None);
        assert_eq!(JoinDecision::Accept.status(), JoinStatus::Accepted);
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("pending".parse::<JoinStatus>().unwrap(), JoinStatus::Pending);
        assert!("maybe".parse::<JoinStatus>().is_err());
    }
}
