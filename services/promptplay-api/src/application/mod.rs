//! 应用层

pub mod auth;
pub mod games;
pub mod join_requests;

pub use auth::{AuthService, AuthSession, RegisterCommand};
pub use games::{GameService, Stats};
pub use join_requests::JoinRequestService;
