//! 用户实体

use chrono::{DateTime, Utc};
use promptplay_auth_core::HashedPassword;
use promptplay_common::UserId;

/// 用户
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: Option<String>,
    /// 访客和未设置密码的用户为空
    pub hashed_password: Option<HashedPassword>,
    pub is_guest: bool,
    pub created_at: DateTime<Utc>,
}

/// 待插入的用户，ID 由数据库分配
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: Option<String>,
    pub hashed_password: Option<HashedPassword>,
    pub is_guest: bool,
}

impl NewUser {
    pub fn guest(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            email: None,
            hashed_password: None,
            is_guest: true,
        }
    }
}
