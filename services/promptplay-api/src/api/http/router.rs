//! 路由表和中间件栈

use std::time::Duration;

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{delete, get, post, put},
};
use promptplay_config::ServerConfig;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::warn;

use crate::api::http::AppState;
use crate::api::http::handlers::{auth, games, health, join_requests};
use crate::api::http::security_headers_middleware;

/// 请求体上限 64 KiB
const MAX_BODY_BYTES: usize = 64 * 1024;

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(%origin, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
}

pub fn build_router(state: AppState, server: &ServerConfig) -> Router {
    Router::new()
        .route("/", get(games::root))
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/metrics", get(health::metrics))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/guest", post(auth::guest))
        .route("/auth/me", get(auth::me))
        .route("/requests", get(games::list_requests))
        .route("/requests/{id}", delete(games::delete_request))
        .route("/create-request", post(games::create_request))
        .route("/find-match", post(games::find_match))
        .route("/my-games/hosted", get(games::hosted))
        .route("/my-games/joined", get(games::joined))
        .route("/games/{id}/join", post(join_requests::join_game))
        .route(
            "/games/{id}/join-requests",
            get(join_requests::list_join_requests),
        )
        .route(
            "/join-requests/{id}",
            put(join_requests::update_join_request),
        )
        .with_state(state)
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TimeoutLayer::new(Duration::from_secs(
            server.request_timeout_secs,
        )))
        .layer(cors_layer(&server.cors_allowed_origins))
        .layer(TraceLayer::new_for_http())
}
