//! PostgreSQL 用户 Repository 实现

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use promptplay_adapter_postgres::is_unique_violation;
use promptplay_auth_core::HashedPassword;
use promptplay_common::UserId;
use promptplay_errors::{AppError, AppResult};
use sqlx::PgPool;

use crate::domain::repositories::UserRepository;
use crate::domain::{NewUser, User};

const USER_COLUMNS: &str = "id, username, email, hashed_password, is_guest, created_at";

pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_by_id(&self, id: UserId) -> AppResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to find user: {}", e)))?;

        Ok(row.map(UserRow::into_user))
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE username = $1",
            USER_COLUMNS
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to find user: {}", e)))?;

        Ok(row.map(UserRow::into_user))
    }

    async fn exists_by_username(&self, username: &str) -> AppResult<bool> {
        let result: (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)")
                .bind(username)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| AppError::database(format!("Failed to check username: {}", e)))?;

        Ok(result.0)
    }

    async fn exists_by_email(&self, email: &str) -> AppResult<bool> {
        let result: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
            .bind(email)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to check email: {}", e)))?;

        Ok(result.0)
    }

    async fn create(&self, user: NewUser) -> AppResult<User> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (username, email, hashed_password, is_guest)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(&user.username)
        .bind(&user.email)
        .bind(user.hashed_password.as_ref().map(HashedPassword::as_str))
        .bind(user.is_guest)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::validation("Username or email already exists")
            } else {
                AppError::database(format!("Failed to create user: {}", e))
            }
        })?;

        Ok(row.into_user())
    }

    async fn count(&self) -> AppResult<i64> {
        let result: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to count users: {}", e)))?;

        Ok(result.0)
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
    email: Option<String>,
    hashed_password: Option<String>,
    is_guest: bool,
    created_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self) -> User {
        User {
            id: UserId(self.id),
            username: self.username,
            email: self.email,
            hashed_password: self.hashed_password.map(HashedPassword::from_hash),
            is_guest: self.is_guest,
            created_at: self.created_at,
        }
    }
}
