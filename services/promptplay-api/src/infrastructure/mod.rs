//! 基础设施层

pub mod admin;
pub mod migrations;
pub mod persistence;

pub use migrations::schema_migrations;
