//! 健康检查和指标路由

use async_trait::async_trait;
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use promptplay_adapter_postgres::check_connection;
use promptplay_errors::{AppError, AppResult};
use promptplay_telemetry::HealthStatus;
use sqlx::PgPool;

use crate::api::http::AppState;
use crate::api::http::dto::{CheckResponse, HealthResponse, ReadinessResponse};

/// 就绪检查的依赖探针
#[async_trait]
pub trait HealthProbe: Send + Sync {
    fn name(&self) -> &'static str;

    async fn check(&self) -> Result<(), String>;
}

pub struct PostgresProbe {
    pool: PgPool,
}

impl PostgresProbe {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HealthProbe for PostgresProbe {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn check(&self) -> Result<(), String> {
        check_connection(&self.pool).await.map_err(|e| e.to_string())
    }
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// GET /ready，任一探针失败返回 503
pub async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    let mut status = HealthStatus::new();
    for probe in &state.probes {
        match probe.check().await {
            Ok(()) => status.add_check(probe.name(), true, None),
            Err(message) => {
                tracing::warn!(probe = probe.name(), %message, "Readiness check failed");
                status.add_check(probe.name(), false, Some(message));
            }
        }
    }

    let code = if status.healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let body = ReadinessResponse {
        ready: status.healthy,
        checks: status
            .checks
            .into_iter()
            .map(|c| CheckResponse {
                name: c.name,
                healthy: c.healthy,
                message: c.message,
            })
            .collect(),
    };

    (code, Json(body))
}

/// GET /metrics
pub async fn metrics(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let handle = state
        .metrics
        .as_ref()
        .ok_or_else(|| AppError::not_found("Metrics are not enabled"))?;

    Ok((
        [(CONTENT_TYPE, "text/plain; version=0.0.4")],
        handle.render(),
    ))
}
