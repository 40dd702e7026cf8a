//! PostgreSQL 加入申请 Repository 实现

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use promptplay_adapter_postgres::is_unique_violation;
use promptplay_common::{GameId, JoinRequestId, UserId};
use promptplay_errors::{AppError, AppResult};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::repositories::JoinRequestRepository;
use crate::domain::{JoinRequest, JoinRequestView, JoinStatus, NewJoinRequest};

const JOIN_COLUMNS: &str = "id, game_id, user_id, description, status, created_at, updated_at";

const JOIN_VIEW_SELECT: &str = r#"
    SELECT j.id, j.game_id, j.user_id, j.description, j.status, j.created_at, j.updated_at,
           u.username
    FROM join_requests j
    JOIN users u ON u.id = j.user_id
"#;

pub struct PostgresJoinRequestRepository {
    pool: PgPool,
}

impl PostgresJoinRequestRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JoinRequestRepository for PostgresJoinRequestRepository {
    async fn create(&self, request: NewJoinRequest) -> AppResult<JoinRequest> {
        let row = sqlx::query_as::<_, JoinRow>(&format!(
            r#"
            INSERT INTO join_requests (game_id, user_id, description, status)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            JOIN_COLUMNS
        ))
        .bind(request.game_id.0)
        .bind(request.user_id.0)
        .bind(&request.description)
        .bind(JoinStatus::Pending.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::validation("You have already requested to join this game")
            } else {
                AppError::database(format!("Failed to create join request: {}", e))
            }
        })?;

        row.into_request()
    }

    async fn find_by_id(&self, id: JoinRequestId) -> AppResult<Option<JoinRequestView>> {
        let row = sqlx::query_as::<_, JoinViewRow>(&format!("{} WHERE j.id = $1", JOIN_VIEW_SELECT))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to find join request: {}", e)))?;

        row.map(JoinViewRow::into_view).transpose()
    }

    async fn exists_for(&self, game_id: GameId, user_id: UserId) -> AppResult<bool> {
        let result: (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM join_requests WHERE game_id = $1 AND user_id = $2)",
        )
        .bind(game_id.0)
        .bind(user_id.0)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to check join request: {}", e)))?;

        Ok(result.0)
    }

    async fn list_for_game(&self, game_id: GameId) -> AppResult<Vec<JoinRequestView>> {
        let rows = sqlx::query_as::<_, JoinViewRow>(&format!(
            "{} WHERE j.game_id = $1 ORDER BY j.created_at, j.id",
            JOIN_VIEW_SELECT
        ))
        .bind(game_id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to list join requests: {}", e)))?;

        rows.into_iter().map(JoinViewRow::into_view).collect()
    }

    async fn update_status(&self, id: JoinRequestId, status: JoinStatus) -> AppResult<JoinRequest> {
        let row = sqlx::query_as::<_, JoinRow>(&format!(
            "UPDATE join_requests SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            JOIN_COLUMNS
        ))
        .bind(id.0)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to update join request: {}", e)))?
        .ok_or_else(|| AppError::not_found("Join request not found"))?;

        row.into_request()
    }

    async fn count_accepted(&self, game_id: GameId) -> AppResult<i64> {
        let result: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM join_requests WHERE game_id = $1 AND status = $2",
        )
        .bind(game_id.0)
        .bind(JoinStatus::Accepted.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to count join requests: {}", e)))?;

        Ok(result.0)
    }
}

#[derive(sqlx::FromRow)]
struct JoinRow {
    id: i64,
    game_id: Uuid,
    user_id: i64,
    description: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl JoinRow {
    fn into_request(self) -> AppResult<JoinRequest> {
        let status = self.status.parse::<JoinStatus>().map_err(|e| {
            AppError::database(format!(
                "Invalid status in database for join request {}: {}",
                self.id, e
            ))
        })?;

        Ok(JoinRequest {
            id: JoinRequestId(self.id),
            game_id: GameId::from_uuid(self.game_id),
            user_id: UserId(self.user_id),
            description: self.description,
            status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct JoinViewRow {
    #[sqlx(flatten)]
    request: JoinRow,
    username: String,
}

impl JoinViewRow {
    fn into_view(self) -> AppResult<JoinRequestView> {
        Ok(JoinRequestView {
            request: self.request.into_request()?,
            username: self.username,
        })
    }
}
