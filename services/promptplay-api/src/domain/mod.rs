//! 领域层

pub mod game;
pub mod join_request;
pub mod repositories;
pub mod services;
pub mod user;

pub use game::*;
pub use join_request::*;
pub use user::*;
