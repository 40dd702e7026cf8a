//! 密码哈希

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use promptplay_errors::AppError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Argon2 哈希后的密码（PHC 字符串）
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashedPassword(String);

impl HashedPassword {
    /// 从明文密码创建哈希密码，每次使用随机盐
    pub fn from_plain(plain_password: &str) -> Result<Self, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);

        let password_hash = Argon2::default()
            .hash_password(plain_password.as_bytes(), &salt)
            .map_err(|e| PasswordError::HashingFailed(e.to_string()))?
            .to_string();

        Ok(Self(password_hash))
    }

    /// 验证明文密码是否匹配
    pub fn verify(&self, plain_password: &str) -> Result<bool, PasswordError> {
        let parsed_hash =
            PasswordHash::new(&self.0).map_err(|e| PasswordError::InvalidHash(e.to_string()))?;

        Ok(Argon2::default()
            .verify_password(plain_password.as_bytes(), &parsed_hash)
            .is_ok())
    }

    /// 从已有的哈希字符串创建
    pub fn from_hash(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for HashedPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HashedPassword([REDACTED])")
    }
}

impl fmt::Display for HashedPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

/// Password 错误
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("Password hashing failed: {0}")]
    HashingFailed(String),

    #[error("Invalid password hash: {0}")]
    InvalidHash(String),
}

impl From<PasswordError> for AppError {
    fn from(err: PasswordError) -> Self {
        AppError::internal(err.to_string())
    }
}
