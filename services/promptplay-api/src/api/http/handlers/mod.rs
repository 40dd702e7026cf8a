//! 路由处理函数

pub mod auth;
pub mod games;
pub mod health;
pub mod join_requests;
