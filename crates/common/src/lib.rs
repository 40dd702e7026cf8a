//! promptplay-common - 通用类型和工具库

pub mod retry;
pub mod types;

pub use retry::*;
pub use types::*;
