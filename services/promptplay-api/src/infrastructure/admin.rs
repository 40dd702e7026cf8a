//! 数据库维护操作（统计、清空、重建）

use promptplay_adapter_postgres::MigrationManager;
use promptplay_errors::{AppError, AppResult};
use sqlx::PgPool;
use tracing::info;

use crate::infrastructure::schema_migrations;

/// 用户概要
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
    pub is_guest: bool,
}

/// 数据库统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatabaseStats {
    pub users: i64,
    pub game_requests: i64,
    pub join_requests: i64,
    pub user_list: Vec<UserSummary>,
}

/// 清空操作删除的行数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClearReport {
    pub join_requests: u64,
    pub game_requests: u64,
    pub users: u64,
}

pub struct DatabaseAdmin {
    pool: PgPool,
}

impl DatabaseAdmin {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn count(&self, table: &str) -> AppResult<i64> {
        let result: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to count {}: {}", table, e)))?;
        Ok(result.0)
    }

    pub async fn stats(&self) -> AppResult<DatabaseStats> {
        let user_list = sqlx::query_as::<_, UserSummary>(
            "SELECT id, username, is_guest FROM users ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to list users: {}", e)))?;

        Ok(DatabaseStats {
            users: self.count("users").await?,
            game_requests: self.count("game_requests").await?,
            join_requests: self.count("join_requests").await?,
            user_list,
        })
    }

    /// 删除数据但保留表，`keep_users` 为 true 时只清组局数据
    async fn clear(&self, keep_users: bool) -> AppResult<ClearReport> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::database(format!("Failed to begin transaction: {}", e)))?;

        let mut report = ClearReport::default();

        // 按外键依赖顺序删除
        for table in ["join_requests", "game_requests", "users"] {
            if keep_users && table == "users" {
                continue;
            }
            let deleted = sqlx::query(&format!("DELETE FROM {}", table))
                .execute(&mut *tx)
                .await
                .map_err(|e| AppError::database(format!("Failed to clear {}: {}", table, e)))?
                .rows_affected();

            match table {
                "join_requests" => report.join_requests = deleted,
                "game_requests" => report.game_requests = deleted,
                _ => report.users = deleted,
            }
        }

        tx.commit()
            .await
            .map_err(|e| AppError::database(format!("Failed to commit: {}", e)))?;

        info!(?report, keep_users, "Database cleared");
        Ok(report)
    }

    /// 删除全部数据
    pub async fn clear_all(&self) -> AppResult<ClearReport> {
        self.clear(false).await
    }

    /// 删除组局和加入申请，保留用户
    pub async fn clear_games(&self) -> AppResult<ClearReport> {
        self.clear(true).await
    }

    /// 回滚全部迁移后重新应用
    pub async fn reset(&self) -> AppResult<()> {
        let manager = MigrationManager::new(self.pool.clone());
        let migrations = schema_migrations();

        let rolled_back = manager.rollback_all(&migrations).await?;
        let report = manager.migrate(&migrations).await?;

        info!(rolled_back, applied = report.applied.len(), "Database reset");
        Ok(())
    }
}
