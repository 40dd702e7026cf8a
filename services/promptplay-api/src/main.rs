//! PromptPlay API 服务

use anyhow::Context;
use promptplay_api::api::http::{AppState, build_router};
use promptplay_api::infrastructure::schema_migrations;
use promptplay_bootstrap::{Infrastructure, init_runtime, install_metrics, shutdown_signal};
use promptplay_config::AppConfig;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load("config").context("Failed to load configuration")?;
    config
        .validate_for_service()
        .context("Invalid service configuration")?;
    init_runtime(&config);

    info!(
        app = %config.app_name,
        env = %config.app_env,
        model = %config.llm.model,
        "Starting PromptPlay API"
    );

    let metrics = install_metrics();
    let server_config = config.server.clone();
    let addr = config.bind_address();

    let infra = Infrastructure::from_config(config, &schema_migrations())
        .await
        .context("Failed to initialize infrastructure")?;

    let mut state = AppState::from_infrastructure(&infra);
    if let Some(handle) = metrics {
        state = state.with_metrics(handle);
    }

    let app = build_router(state, &server_config);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(%addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Server stopped");
    Ok(())
}
