//! promptplay-auth-core - 认证核心库
//!
//! JWT 令牌签发/校验与 Argon2 密码哈希

mod password;
mod token;

pub use password::*;
pub use token::*;
