//! PostgreSQL 迁移管理模块
//!
//! 迁移以代码形式嵌入服务，启动时按版本顺序应用

use std::collections::HashMap;

use promptplay_errors::{AppError, AppResult};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use tracing::{info, warn};

const MIGRATIONS_TABLE: &str = "_migrations";

/// 迁移记录
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MigrationRecord {
    pub version: i64,
    pub name: String,
    pub applied_at: chrono::DateTime<chrono::Utc>,
    pub checksum: String,
}

/// 迁移定义
#[derive(Debug, Clone)]
pub struct Migration {
    pub version: i64,
    pub name: String,
    /// 升级 SQL，可包含多条语句
    pub up_sql: String,
    /// 降级 SQL（可选）
    pub down_sql: Option<String>,
    pub checksum: String,
}

impl Migration {
    pub fn new(version: i64, name: impl Into<String>, up_sql: impl Into<String>) -> Self {
        let up_sql = up_sql.into();
        let checksum = Self::calculate_checksum(&up_sql);
        Self {
            version,
            name: name.into(),
            up_sql,
            down_sql: None,
            checksum,
        }
    }

    pub fn with_down(mut self, down_sql: impl Into<String>) -> Self {
        self.down_sql = Some(down_sql.into());
        self
    }

    fn calculate_checksum(sql: &str) -> String {
        format!("{:x}", Sha256::digest(sql.as_bytes()))
    }
}

/// 迁移结果
#[derive(Debug, Clone, Default)]
pub struct MigrationReport {
    pub applied: Vec<i64>,
    pub skipped: Vec<i64>,
}

/// 迁移管理器
pub struct MigrationManager {
    pool: PgPool,
}

impl MigrationManager {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 初始化迁移表
    pub async fn init(&self) -> AppResult<()> {
        let create_sql = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                version BIGINT PRIMARY KEY,
                name VARCHAR(255) NOT NULL,
                applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                checksum VARCHAR(64) NOT NULL
            )
            "#,
            MIGRATIONS_TABLE
        );

        sqlx::query(&create_sql)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to create migration table: {}", e)))?;

        Ok(())
    }

    /// 获取已应用的迁移
    pub async fn get_applied_migrations(&self) -> AppResult<Vec<MigrationRecord>> {
        let sql = format!(
            "SELECT version, name, applied_at, checksum FROM {} ORDER BY version ASC",
            MIGRATIONS_TABLE
        );

        sqlx::query_as::<_, MigrationRecord>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to get migrations: {}", e)))
    }

    /// 在事务中应用单个迁移
    async fn apply(&self, migration: &Migration) -> AppResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::database(format!("Failed to begin transaction: {}", e)))?;

        sqlx::raw_sql(&migration.up_sql)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::database(format!(
                    "Failed to apply migration {} ({}): {}",
                    migration.version, migration.name, e
                ))
            })?;

        let insert_sql = format!(
            "INSERT INTO {} (version, name, checksum) VALUES ($1, $2, $3)",
            MIGRATIONS_TABLE
        );
        sqlx::query(&insert_sql)
            .bind(migration.version)
            .bind(&migration.name)
            .bind(&migration.checksum)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::database(format!("Failed to record migration: {}", e)))?;

        tx.commit()
            .await
            .map_err(|e| AppError::database(format!("Failed to commit migration: {}", e)))?;

        info!(
            version = migration.version,
            name = %migration.name,
            "Migration applied"
        );
        Ok(())
    }

    /// 在事务中回滚单个迁移
    async fn rollback(&self, migration: &Migration) -> AppResult<()> {
        let down_sql = migration.down_sql.as_deref().ok_or_else(|| {
            AppError::internal(format!(
                "Migration {} does not have down SQL",
                migration.version
            ))
        })?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::database(format!("Failed to begin transaction: {}", e)))?;

        sqlx::raw_sql(down_sql).execute(&mut *tx).await.map_err(|e| {
            AppError::database(format!(
                "Failed to rollback migration {}: {}",
                migration.version, e
            ))
        })?;

        let delete_sql = format!("DELETE FROM {} WHERE version = $1", MIGRATIONS_TABLE);
        sqlx::query(&delete_sql)
            .bind(migration.version)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::database(format!("Failed to delete migration record: {}", e)))?;

        tx.commit()
            .await
            .map_err(|e| AppError::database(format!("Failed to commit rollback: {}", e)))?;

        info!(
            version = migration.version,
            name = %migration.name,
            "Migration rolled back"
        );
        Ok(())
    }

    /// 应用所有待处理的迁移
    ///
    /// 已应用迁移的 SQL 被修改过时直接报错，不会继续应用后续版本
    pub async fn migrate(&self, migrations: &[Migration]) -> AppResult<MigrationReport> {
        self.init().await?;

        let applied: HashMap<i64, String> = self
            .get_applied_migrations()
            .await?
            .into_iter()
            .map(|record| (record.version, record.checksum))
            .collect();

        let mut sorted: Vec<&Migration> = migrations.iter().collect();
        sorted.sort_by_key(|m| m.version);

        let mut report = MigrationReport::default();
        for migration in sorted {
            match applied.get(&migration.version) {
                Some(checksum) if *checksum != migration.checksum => {
                    return Err(AppError::internal(format!(
                        "Checksum mismatch for migration {} ({}): migration has been modified",
                        migration.version, migration.name
                    )));
                }
                Some(_) => report.skipped.push(migration.version),
                None => {
                    self.apply(migration).await?;
                    report.applied.push(migration.version);
                }
            }
        }

        Ok(report)
    }

    /// 按版本倒序回滚所有已应用的迁移
    pub async fn rollback_all(&self, migrations: &[Migration]) -> AppResult<u32> {
        self.init().await?;

        let mut applied = self.get_applied_migrations().await?;
        applied.sort_by(|a, b| b.version.cmp(&a.version));

        let mut count = 0;
        for record in applied {
            match migrations.iter().find(|m| m.version == record.version) {
                Some(migration) => {
                    self.rollback(migration).await?;
                    count += 1;
                }
                None => {
                    warn!(
                        version = record.version,
                        name = %record.name,
                        "Applied migration is unknown to this build, stopping rollback"
                    );
                    return Err(AppError::internal(format!(
                        "Migration {} not found in provided migrations",
                        record.version
                    )));
                }
            }
        }

        Ok(count)
    }
}
