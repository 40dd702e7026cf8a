//! 服务运行时

use metrics_exporter_prometheus::PrometheusHandle;
use promptplay_config::AppConfig;
use promptplay_telemetry::{init_metrics, init_tracing, init_tracing_json};
use tracing::{info, warn};

/// 初始化服务运行时（日志）
pub fn init_runtime(config: &AppConfig) {
    if config.json_logs() {
        init_tracing_json(&config.telemetry.log_level);
    } else {
        init_tracing(&config.telemetry.log_level);
    }

    info!(
        app_name = %config.app_name,
        app_env = %config.app_env,
        "Runtime initialized"
    );
}

/// 安装 Prometheus 记录器，失败时服务照常运行但不暴露 /metrics
pub fn install_metrics() -> Option<PrometheusHandle> {
    match init_metrics() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!(error = %e, "Metrics disabled");
            None
        }
    }
}

/// 等待关闭信号（Ctrl+C 或 SIGTERM）
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
