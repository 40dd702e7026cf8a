//! promptplay-bootstrap - 服务启动骨架
//!
//! 负责组装基础设施（连接池、迁移、令牌服务、LLM 客户端）和运行时（日志、指标、关闭信号）

mod infrastructure;
mod runtime;

pub use infrastructure::*;
pub use runtime::*;
