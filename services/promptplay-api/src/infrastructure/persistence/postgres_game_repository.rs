//! PostgreSQL 组局 Repository 实现

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use promptplay_common::{GameId, UserId};
use promptplay_errors::{AppError, AppResult};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::repositories::GameRepository;
use crate::domain::{GameQuery, GameRequest, GameStatus, GameView};

const GAME_COLUMNS: &str = "id, host_id, original_prompt, sport, location, datetime_utc, \
                            players_needed, status, created_at";

/// 组局读模型查询：发起人用户名 + 已接受人数
const GAME_VIEW_SELECT: &str = r#"
    SELECT g.id, g.host_id, g.original_prompt, g.sport, g.location, g.datetime_utc,
           g.players_needed, g.status, g.created_at,
           u.username AS host_username,
           (SELECT COUNT(*) FROM join_requests j
             WHERE j.game_id = g.id AND j.status = 'accepted') AS players_joined
    FROM game_requests g
    JOIN users u ON u.id = g.host_id
"#;

pub struct PostgresGameRepository {
    pool: PgPool,
}

impl PostgresGameRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GameRepository for PostgresGameRepository {
    async fn create(&self, game: &GameRequest) -> AppResult<()> {
        sqlx::query(&format!(
            "INSERT INTO game_requests ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
            GAME_COLUMNS
        ))
        .bind(game.id.0)
        .bind(game.host_id.0)
        .bind(&game.original_prompt)
        .bind(&game.sport)
        .bind(&game.location)
        .bind(game.datetime_utc)
        .bind(game.players_needed)
        .bind(game.status.as_str())
        .bind(game.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to save game request: {}", e)))?;

        Ok(())
    }

    async fn find_by_id(&self, id: GameId) -> AppResult<Option<GameRequest>> {
        let row = sqlx::query_as::<_, GameRow>(&format!(
            "SELECT {} FROM game_requests WHERE id = $1",
            GAME_COLUMNS
        ))
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to find game request: {}", e)))?;

        row.map(GameRow::into_game).transpose()
    }

    async fn list(&self, query: GameQuery) -> AppResult<Vec<GameView>> {
        const ORDER: &str = "ORDER BY g.created_at DESC, g.id";

        let rows = match query {
            GameQuery::All => {
                sqlx::query_as::<_, GameViewRow>(&format!("{} {}", GAME_VIEW_SELECT, ORDER))
                    .fetch_all(&self.pool)
                    .await
            }
            GameQuery::Open => {
                sqlx::query_as::<_, GameViewRow>(&format!(
                    "{} WHERE g.status = $1 {}",
                    GAME_VIEW_SELECT, ORDER
                ))
                .bind(GameStatus::Open.as_str())
                .fetch_all(&self.pool)
                .await
            }
            GameQuery::HostedBy(user_id) => {
                sqlx::query_as::<_, GameViewRow>(&format!(
                    "{} WHERE g.host_id = $1 {}",
                    GAME_VIEW_SELECT, ORDER
                ))
                .bind(user_id.0)
                .fetch_all(&self.pool)
                .await
            }
            GameQuery::JoinedBy(user_id) => {
                sqlx::query_as::<_, GameViewRow>(&format!(
                    r#"{} WHERE EXISTS (
                        SELECT 1 FROM join_requests m
                        WHERE m.game_id = g.id AND m.user_id = $1 AND m.status = 'accepted'
                    ) {}"#,
                    GAME_VIEW_SELECT, ORDER
                ))
                .bind(user_id.0)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(|e| AppError::database(format!("Failed to list game requests: {}", e)))?;

        rows.into_iter().map(GameViewRow::into_view).collect()
    }

    async fn update_status(&self, id: GameId, status: GameStatus) -> AppResult<()> {
        sqlx::query("UPDATE game_requests SET status = $2 WHERE id = $1")
            .bind(id.0)
            .bind(status.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to update game status: {}", e)))?;

        Ok(())
    }

    async fn delete(&self, id: GameId) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM game_requests WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to delete game request: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> AppResult<i64> {
        let result: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM game_requests")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to count game requests: {}", e)))?;

        Ok(result.0)
    }
}

#[derive(sqlx::FromRow)]
struct GameRow {
    id: Uuid,
    host_id: i64,
    original_prompt: String,
    sport: String,
    location: String,
    datetime_utc: DateTime<Utc>,
    players_needed: i32,
    status: String,
    created_at: DateTime<Utc>,
}

impl GameRow {
    fn into_game(self) -> AppResult<GameRequest> {
        let status = self.status.parse::<GameStatus>().map_err(|e| {
            AppError::database(format!("Invalid status in database for game {}: {}", self.id, e))
        })?;

        Ok(GameRequest {
            id: GameId::from_uuid(self.id),
            host_id: UserId(self.host_id),
            original_prompt: self.original_prompt,
            sport: self.sport,
            location: self.location,
            datetime_utc: self.datetime_utc,
            players_needed: self.players_needed,
            status,
            created_at: self.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct GameViewRow {
    #[sqlx(flatten)]
    game: GameRow,
    host_username: String,
    players_joined: i64,
}

impl GameViewRow {
    fn into_view(self) -> AppResult<GameView> {
        Ok(GameView::new(
            self.game.into_game()?,
            self.host_username,
            self.players_joined,
        ))
    }
}
