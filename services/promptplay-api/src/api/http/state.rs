//! 路由共享状态

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;
use promptplay_bootstrap::Infrastructure;

use crate::api::http::handlers::health::{HealthProbe, PostgresProbe};
use crate::application::{AuthService, GameService, JoinRequestService};
use crate::domain::repositories::{GameRepository, JoinRequestRepository, UserRepository};
use crate::domain::services::{ExtractionService, MatchingService};
use crate::infrastructure::persistence::{
    PostgresGameRepository, PostgresJoinRequestRepository, PostgresUserRepository,
};

#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub games: Arc<GameService>,
    pub join_requests: Arc<JoinRequestService>,
    pub probes: Vec<Arc<dyn HealthProbe>>,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(
        auth: Arc<AuthService>,
        games: Arc<GameService>,
        join_requests: Arc<JoinRequestService>,
    ) -> Self {
        Self {
            auth,
            games,
            join_requests,
            probes: Vec::new(),
            metrics: None,
        }
    }

    pub fn with_probe(mut self, probe: Arc<dyn HealthProbe>) -> Self {
        self.probes.push(probe);
        self
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// 用 PostgreSQL repositories 和配置好的 LLM 客户端组装服务
    pub fn from_infrastructure(infra: &Infrastructure) -> Self {
        let pool = infra.postgres_pool();
        let llm = infra.llm_client();
        let llm_config = &infra.config().llm;

        let users: Arc<dyn UserRepository> = Arc::new(PostgresUserRepository::new(pool.clone()));
        let games: Arc<dyn GameRepository> = Arc::new(PostgresGameRepository::new(pool.clone()));
        let join_requests: Arc<dyn JoinRequestRepository> =
            Arc::new(PostgresJoinRequestRepository::new(pool.clone()));

        let extraction = ExtractionService::new(llm.clone(), llm_config.extraction_temperature);
        let matching = MatchingService::new(
            llm,
            llm_config.matching_temperature,
            llm_config.match_concurrency,
        );

        Self::new(
            Arc::new(AuthService::new(users.clone(), infra.token_service())),
            Arc::new(GameService::new(games.clone(), users, extraction, matching)),
            Arc::new(JoinRequestService::new(games, join_requests)),
        )
        .with_probe(Arc::new(PostgresProbe::new(pool)))
    }
}
