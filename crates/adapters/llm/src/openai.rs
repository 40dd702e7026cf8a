//! OpenAI 兼容的 Chat Completions 客户端

use std::fmt;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use promptplay_common::{RetryConfig, with_conditional_retry};
use promptplay_errors::{AppError, AppResult};
use promptplay_telemetry::names;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::client::{ChatRequest, LlmClient};

/// 错误响应体在日志和错误消息中最多保留的字符数
const MAX_ERROR_BODY_CHARS: usize = 512;

/// 客户端配置
#[derive(Debug, Clone)]
pub struct OpenAiClientConfig {
    pub api_key: Secret<String>,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub timeout: Duration,
    pub retry: RetryConfig,
}

impl OpenAiClientConfig {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            api_key: Secret::new(api_key.into()),
            base_url: base_url.into(),
            model: model.into(),
            max_tokens: 1024,
            timeout: Duration::from_secs(30),
            retry: RetryConfig::default(),
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatCompletionBody<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// 单次调用失败
#[derive(Debug)]
struct CallFailure {
    message: String,
    retryable: bool,
}

impl CallFailure {
    fn retryable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: true,
        }
    }

    fn fatal(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: false,
        }
    }
}

impl fmt::Display for CallFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// OpenAI 兼容客户端（Groq、OpenAI、本地 vLLM 等）
pub struct OpenAiCompatibleClient {
    http: reqwest::Client,
    endpoint: String,
    config: OpenAiClientConfig,
}

impl OpenAiCompatibleClient {
    pub fn new(config: OpenAiClientConfig) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::internal(format!("Failed to build HTTP client: {}", e)))?;

        let endpoint = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));

        Ok(Self {
            http,
            endpoint,
            config,
        })
    }

    async fn call_once(&self, request: &ChatRequest) -> Result<String, CallFailure> {
        let body = ChatCompletionBody {
            model: &self.config.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user,
                },
            ],
            temperature: request.temperature,
            max_tokens: self.config.max_tokens,
        };

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(self.config.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() || e.is_connect() || e.is_request() {
                    CallFailure::retryable(e.to_string())
                } else {
                    CallFailure::fatal(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let text: String = text.chars().take(MAX_ERROR_BODY_CHARS).collect();
            let message = format!("{}: {}", status, text);
            return Err(if is_retryable_status(status) {
                CallFailure::retryable(message)
            } else {
                CallFailure::fatal(message)
            });
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| CallFailure::fatal(format!("invalid response body: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| CallFailure::fatal("response contained no message content"))
    }
}

fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

#[async_trait]
impl LlmClient for OpenAiCompatibleClient {
    #[instrument(skip_all, fields(purpose = request.purpose.as_str(), model = %self.config.model))]
    async fn complete(&self, request: ChatRequest) -> AppResult<String> {
        let purpose = request.purpose.as_str();
        let started = Instant::now();

        let result = with_conditional_retry(
            &self.config.retry,
            "llm chat completion",
            || self.call_once(&request),
            |failure| failure.retryable,
        )
        .await;

        metrics::histogram!(names::LLM_REQUEST_DURATION_SECONDS, "purpose" => purpose)
            .record(started.elapsed().as_secs_f64());

        match result {
            Ok(content) => {
                metrics::counter!(names::LLM_REQUESTS_TOTAL, "purpose" => purpose, "outcome" => "success")
                    .increment(1);
                debug!(chars = content.len(), "LLM completion received");
                Ok(content)
            }
            Err(failure) => {
                metrics::counter!(names::LLM_REQUESTS_TOTAL, "purpose" => purpose, "outcome" => "error")
                    .increment(1);
                Err(AppError::external_service(format!(
                    "LLM API error: {}",
                    failure
                )))
            }
        }
    }
}
