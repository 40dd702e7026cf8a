//! 认证用例：注册、登录、访客登录、当前用户

use std::sync::Arc;

use promptplay_auth_core::{HashedPassword, TokenService};
use promptplay_errors::{AppError, AppResult};
use rand::Rng;
use tracing::{debug, info, instrument};

use crate::domain::repositories::UserRepository;
use crate::domain::{NewUser, User};

/// 访客用户名的重新抽取次数上限
const GUEST_NAME_ATTEMPTS: usize = 20;

/// 注册参数
#[derive(Debug, Clone, Default)]
pub struct RegisterCommand {
    pub username: String,
    pub email: Option<String>,
    pub password: Option<String>,
    pub is_guest: bool,
}

/// 登录结果
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub access_token: String,
    pub user: User,
}

pub struct AuthService {
    users: Arc<dyn UserRepository>,
    tokens: Arc<TokenService>,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserRepository>, tokens: Arc<TokenService>) -> Self {
        Self { users, tokens }
    }

    fn session_for(&self, user: User) -> AppResult<AuthSession> {
        let access_token = self.tokens.generate_access_token(user.id, &user.username)?;
        Ok(AuthSession { access_token, user })
    }

    /// 注册用户或访客账号
    #[instrument(skip(self, command), fields(username = %command.username, is_guest = command.is_guest))]
    pub async fn register(&self, command: RegisterCommand) -> AppResult<AuthSession> {
        let username = command.username.trim();
        if username.is_empty() {
            return Err(AppError::validation("Username must not be empty"));
        }

        if self.users.exists_by_username(username).await? {
            return Err(AppError::validation("Username already exists"));
        }

        let email = command
            .email
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty());
        if let Some(email) = &email {
            if self.users.exists_by_email(email).await? {
                return Err(AppError::validation("Email already exists"));
            }
        }

        let hashed_password = match command.password.as_deref() {
            Some(password) if !command.is_guest => Some(HashedPassword::from_plain(password)?),
            _ => None,
        };

        let user = self
            .users
            .create(NewUser {
                username: username.to_string(),
                email,
                hashed_password,
                is_guest: command.is_guest,
            })
            .await?;

        info!(user_id = %user.id, "User registered");
        self.session_for(user)
    }

    /// 用户名密码登录
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> AppResult<AuthSession> {
        let invalid = || AppError::unauthorized("Invalid username or password");

        let user = self
            .users
            .find_by_username(username)
            .await?
            .ok_or_else(invalid)?;

        if user.is_guest {
            return Err(AppError::unauthorized(
                "Guest users cannot login with password",
            ));
        }

        let hashed = user.hashed_password.as_ref().ok_or_else(invalid)?;
        if !hashed.verify(password)? {
            return Err(invalid());
        }

        info!(user_id = %user.id, "User logged in");
        self.session_for(user)
    }

    /// 以随机访客名创建访客账号
    #[instrument(skip(self))]
    pub async fn guest_login(&self) -> AppResult<AuthSession> {
        for _ in 0..GUEST_NAME_ATTEMPTS {
            let username = format!("Guest{}", rand::thread_rng().gen_range(1000..=9999));
            if self.users.exists_by_username(&username).await? {
                continue;
            }

            let user = self.users.create(NewUser::guest(username)).await?;
            info!(user_id = %user.id, username = %user.username, "Guest user created");
            return self.session_for(user);
        }

        Err(AppError::conflict(
            "Could not allocate a guest username, please try again",
        ))
    }

    /// 根据访问令牌加载当前用户
    pub async fn current_user(&self, token: &str) -> AppResult<User> {
        let claims = self.tokens.validate_access_token(token).map_err(|e| {
            debug!(error = %e, "Access token rejected");
            AppError::unauthorized("Invalid token")
        })?;
        self.users
            .find_by_id(claims.user_id())
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))
    }
}
