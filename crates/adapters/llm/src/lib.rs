//! promptplay-adapter-llm - 托管大模型适配器
//!
//! `LlmClient` 是服务依赖的端口，`OpenAiCompatibleClient` 对接 OpenAI 兼容的
//! Chat Completions 接口（Groq 默认地址）。

mod client;
mod openai;
mod reply;

pub use client::*;
pub use openai::*;
pub use reply::*;
