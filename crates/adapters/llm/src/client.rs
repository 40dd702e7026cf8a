//! LLM 端口

use async_trait::async_trait;
use promptplay_errors::AppResult;

/// 调用目的，用于日志和指标标签
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmPurpose {
    /// 从自然语言中抽取组局字段
    Extraction,
    /// 判断两条组局请求是否匹配
    Matching,
}

impl LlmPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Extraction => "extraction",
            Self::Matching => "matching",
        }
    }
}

/// 单轮对话请求：一条 system 消息加一条 user 消息
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub purpose: LlmPurpose,
    pub system: String,
    pub user: String,
    pub temperature: f32,
}

impl ChatRequest {
    pub fn new(
        purpose: LlmPurpose,
        system: impl Into<String>,
        user: impl Into<String>,
        temperature: f32,
    ) -> Self {
        Self {
            purpose,
            system: system.into(),
            user: user.into(),
            temperature,
        }
    }
}

/// LLM 客户端
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// 返回助手消息的原始文本
    async fn complete(&self, request: ChatRequest) -> AppResult<String>;
}
