//! promptplay-config - 配置加载库
//!
//! 加载顺序：`default.toml` → `<APP_ENV>.toml` → 环境变量（`PROMPTPLAY_` 前缀，`__` 分隔层级）。

use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load config: {0}")]
    Load(#[from] figment::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// 数据库配置
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: Secret<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    // 开发环境: 10, 生产环境: 50
    match std::env::var("APP_ENV").as_deref() {
        Ok("production") => 50,
        _ => 10,
    }
}

/// JWT 配置
#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: Secret<String>,
    /// 访问令牌有效期（秒）
    #[serde(default = "default_expires_in")]
    pub expires_in: u64,
    #[serde(default = "default_issuer")]
    pub issuer: String,
    #[serde(default = "default_audience")]
    pub audience: String,
}

fn default_expires_in() -> u64 {
    604800
}

fn default_issuer() -> String {
    "promptplay".to_string()
}

fn default_audience() -> String {
    "promptplay-web".to_string()
}

/// 服务器配置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// 允许跨域的前端来源
    #[serde(default = "default_cors_allowed_origins")]
    pub cors_allowed_origins: Vec<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_allowed_origins: default_cors_allowed_origins(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_cors_allowed_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://localhost:5173".to_string(),
    ]
}

// 匹配接口对每个开放组局各调用一次 LLM（有限并发），超时需要留足余量
fn default_request_timeout_secs() -> u64 {
    120
}

/// 遥测配置
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// 未设置时生产环境输出 JSON
    #[serde(default)]
    pub json: Option<bool>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// LLM 配置（OpenAI 兼容的 Chat Completions 接口，默认 Groq）
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub api_key: Secret<String>,
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_llm_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_extraction_temperature")]
    pub extraction_temperature: f32,
    #[serde(default = "default_matching_temperature")]
    pub matching_temperature: f32,
    /// 匹配时同时进行的 LLM 调用数
    #[serde(default = "default_match_concurrency")]
    pub match_concurrency: usize,
}

fn default_llm_base_url() -> String {
    "https://api.groq.com/openai/v1".to_string()
}

fn default_llm_model() -> String {
    "openai/gpt-oss-120b".to_string()
}

fn default_llm_max_tokens() -> u32 {
    1024
}

fn default_llm_timeout_secs() -> u64 {
    30
}

fn default_extraction_temperature() -> f32 {
    0.3
}

fn default_matching_temperature() -> f32 {
    0.5
}

fn default_match_concurrency() -> usize {
    4
}

/// 应用配置
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_app_name")]
    pub app_name: String,
    #[serde(default = "default_app_env")]
    pub app_env: String,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    pub llm: LlmConfig,
}

fn default_app_name() -> String {
    "promptplay".to_string()
}

fn default_app_env() -> String {
    "development".to_string()
}

impl AppConfig {
    /// 从配置文件和环境变量加载配置
    pub fn load(config_dir: &str) -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| default_app_env());

        let config: Self = Figment::new()
            .merge(Toml::file(format!("{}/default.toml", config_dir)))
            .merge(Toml::file(format!("{}/{}.toml", config_dir, env)))
            .merge(("app_env", env))
            .merge(
                Env::raw()
                    .only(&["GROQ_API_KEY"])
                    .map(|_| "llm.api_key".into()),
            )
            .merge(Env::prefixed("PROMPTPLAY_").split("__"))
            .extract()?;

        config.validate()?;
        Ok(config)
    }

    /// 检查加载后的配置是否可用
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt.secret.expose_secret().is_empty() {
            return Err(ConfigError::Invalid("jwt.secret must not be empty".into()));
        }
        if self.is_production() && self.jwt.secret.expose_secret().len() < 32 {
            return Err(ConfigError::Invalid(
                "jwt.secret must be at least 32 characters long in production".into(),
            ));
        }
        if self.llm.match_concurrency == 0 {
            return Err(ConfigError::Invalid(
                "llm.match_concurrency must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// API 服务额外需要的配置；维护工具只连数据库，不做此检查
    pub fn validate_for_service(&self) -> Result<(), ConfigError> {
        if self.llm.api_key.expose_secret().trim().is_empty() {
            return Err(ConfigError::Invalid(
                "llm.api_key must be set (GROQ_API_KEY)".into(),
            ));
        }
        Ok(())
    }

    /// 是否为生产环境
    pub fn is_production(&self) -> bool {
        self.app_env == "production"
    }

    /// 日志是否输出为 JSON
    pub fn json_logs(&self) -> bool {
        self.telemetry.json.unwrap_or_else(|| self.is_production())
    }

    /// HTTP 监听地址
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
