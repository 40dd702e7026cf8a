//! 基础设施资源管理

use std::sync::Arc;
use std::time::Duration;

use promptplay_adapter_llm::{LlmClient, OpenAiClientConfig, OpenAiCompatibleClient};
use promptplay_adapter_postgres::{Migration, MigrationManager, PostgresConfig, create_pool};
use promptplay_auth_core::TokenService;
use promptplay_common::{RetryConfig, is_retryable_error, with_conditional_retry};
use promptplay_config::AppConfig;
use promptplay_errors::AppResult;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use tracing::info;

/// 基础设施资源容器
pub struct Infrastructure {
    config: AppConfig,
    postgres_pool: PgPool,
    token_service: Arc<TokenService>,
    llm_client: Arc<dyn LlmClient>,
}

impl Infrastructure {
    /// 从配置创建基础设施资源，并应用数据库迁移
    pub async fn from_config(config: AppConfig, migrations: &[Migration]) -> AppResult<Self> {
        // 1. PostgreSQL 连接池（带重试）
        let postgres_pool = connect_postgres(&config).await?;
        info!(
            max_connections = config.database.max_connections,
            "PostgreSQL connection pool created"
        );

        // 2. 数据库迁移
        let report = MigrationManager::new(postgres_pool.clone())
            .migrate(migrations)
            .await?;
        info!(
            applied = ?report.applied,
            skipped = report.skipped.len(),
            "Database migrations up to date"
        );

        // 3. TokenService
        let token_service = Arc::new(build_token_service(&config));

        // 4. LLM 客户端
        let llm_client: Arc<dyn LlmClient> = Arc::new(build_llm_client(&config)?);
        info!(
            base_url = %config.llm.base_url,
            model = %config.llm.model,
            "LLM client configured"
        );

        Ok(Self {
            config,
            postgres_pool,
            token_service,
            llm_client,
        })
    }

    /// 获取应用配置
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// 获取 PostgreSQL 连接池
    pub fn postgres_pool(&self) -> PgPool {
        self.postgres_pool.clone()
    }

    /// 获取 Token 服务
    pub fn token_service(&self) -> Arc<TokenService> {
        self.token_service.clone()
    }

    /// 获取 LLM 客户端
    pub fn llm_client(&self) -> Arc<dyn LlmClient> {
        self.llm_client.clone()
    }
}

/// 连接 PostgreSQL，仅对瞬时错误重试
pub async fn connect_postgres(config: &AppConfig) -> AppResult<PgPool> {
    let retry_config = RetryConfig::new(5, Duration::from_millis(500), Duration::from_secs(10));
    let pg_config = PostgresConfig::new(config.database.url.expose_secret())
        .with_max_connections(config.database.max_connections);

    with_conditional_retry(
        &retry_config,
        "PostgreSQL connection",
        || create_pool(&pg_config),
        |e| is_retryable_error(&e.to_string()),
    )
    .await
}

/// 由配置构建 Token 服务
pub fn build_token_service(config: &AppConfig) -> TokenService {
    TokenService::new(
        config.jwt.secret.expose_secret(),
        config.jwt.expires_in as i64,
        config.jwt.issuer.clone(),
        config.jwt.audience.clone(),
    )
}

/// 由配置构建 OpenAI 兼容的 LLM 客户端
pub fn build_llm_client(config: &AppConfig) -> AppResult<OpenAiCompatibleClient> {
    let llm = &config.llm;
    let client_config = OpenAiClientConfig::new(
        llm.api_key.expose_secret().clone(),
        llm.base_url.clone(),
        llm.model.clone(),
    )
    .with_max_tokens(llm.max_tokens)
    .with_timeout(Duration::from_secs(llm.timeout_secs));

    OpenAiCompatibleClient::new(client_config)
}
