//! HTTP API（axum）

pub mod dto;
pub mod extractors;
pub mod handlers;
mod router;
mod security_headers;
mod state;

pub use router::build_router;
pub use security_headers::security_headers_middleware;
pub use state::AppState;
