//! promptplay-api - 用自然语言发布和匹配运动组局
//!
//! 分层：
//! - `domain`: 实体、repository 接口、LLM 解析与匹配
//! - `application`: 用例编排（认证、组局、加入申请）
//! - `infrastructure`: PostgreSQL 实现、迁移、维护操作
//! - `api`: axum HTTP 接口

pub mod api;
pub mod application;
pub mod domain;
pub mod infrastructure;
