//! promptplay-errors - 统一错误处理
//!
//! 基于 RFC 7807 Problem Details 规范

use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// 应用错误类型
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// 带结构化细节的校验错误，细节会平铺到 Problem Details 中
    #[error("Validation error: {message}")]
    IncompleteRequest { message: String, details: Value },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// 请求体无法解析
    #[error("Unprocessable entity: {0}")]
    UnprocessableEntity(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("External service error: {0}")]
    ExternalService(String),
}

impl AppError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn incomplete_request(msg: impl Into<String>, details: Value) -> Self {
        Self::IncompleteRequest {
            message: msg.into(),
            details,
        }
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn unprocessable_entity(msg: impl Into<String>) -> Self {
        Self::UnprocessableEntity(msg.into())
    }

    pub fn payload_too_large(msg: impl Into<String>) -> Self {
        Self::PayloadTooLarge(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    pub fn external_service(msg: impl Into<String>) -> Self {
        Self::ExternalService(msg.into())
    }

    /// 转换为 HTTP 状态码
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::Validation(_) | Self::IncompleteRequest { .. } => 400,
            Self::Unauthorized(_) => 401,
            Self::Forbidden(_) => 403,
            Self::Conflict(_) => 409,
            Self::PayloadTooLarge(_) => 413,
            Self::UnprocessableEntity(_) => 422,
            Self::Internal(_) | Self::Database(_) => 500,
            Self::ExternalService(_) => 502,
        }
    }

    /// 面向客户端的消息（不带变体前缀）
    pub fn message(&self) -> &str {
        match self {
            Self::NotFound(msg)
            | Self::Validation(msg)
            | Self::Unauthorized(msg)
            | Self::Forbidden(msg)
            | Self::Conflict(msg)
            | Self::UnprocessableEntity(msg)
            | Self::PayloadTooLarge(msg)
            | Self::Internal(msg)
            | Self::Database(msg)
            | Self::ExternalService(msg) => msg,
            Self::IncompleteRequest { message, .. } => message,
        }
    }

    /// 转换为 Problem Details
    pub fn to_problem_details(&self) -> ProblemDetails {
        let extensions = match self {
            Self::IncompleteRequest {
                details: Value::Object(map),
                ..
            } => map.clone(),
            _ => Map::new(),
        };

        ProblemDetails {
            r#type: self.problem_type(),
            title: self.problem_title().to_string(),
            status: self.status_code(),
            detail: self.message().to_string(),
            instance: None,
            extensions,
        }
    }

    fn problem_type(&self) -> String {
        let slug = match self {
            Self::NotFound(_) => "not-found",
            Self::Validation(_) => "validation",
            Self::IncompleteRequest { .. } => "incomplete-request",
            Self::Unauthorized(_) => "unauthorized",
            Self::Forbidden(_) => "forbidden",
            Self::Conflict(_) => "conflict",
            Self::UnprocessableEntity(_) => "unprocessable-entity",
            Self::PayloadTooLarge(_) => "payload-too-large",
            Self::Internal(_) => "internal",
            Self::Database(_) => "database",
            Self::ExternalService(_) => "external-service",
        };
        format!("https://promptplay.dev/problems/{}", slug)
    }

    fn problem_title(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "Resource Not Found",
            Self::Validation(_) => "Validation Error",
            Self::IncompleteRequest { .. } => "Missing Required Information",
            Self::Unauthorized(_) => "Unauthorized",
            Self::Forbidden(_) => "Forbidden",
            Self::Conflict(_) => "Conflict",
            Self::UnprocessableEntity(_) => "Unprocessable Entity",
            Self::PayloadTooLarge(_) => "Payload Too Large",
            Self::Internal(_) => "Internal Server Error",
            Self::Database(_) => "Database Error",
            Self::ExternalService(_) => "External Service Error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(error = %self, status = status.as_u16(), "Request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }

        let mut response = (status, Json(self.to_problem_details())).into_response();
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/problem+json"),
        );
        response
    }
}

/// RFC 7807 Problem Details
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemDetails {
    pub r#type: String,
    pub title: String,
    pub status: u16,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    /// 扩展成员
    #[serde(flatten)]
    pub extensions: Map<String, Value>,
}

/// Result 类型别名
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::json;

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::not_found("x").status_code(), 404);
        assert_eq!(AppError::validation("x").status_code(), 400);
        assert_eq!(AppError::unauthorized("x").status_code(), 401);
        assert_eq!(AppError::forbidden("x").status_code(), 403);
        assert_eq!(AppError::conflict("x").status_code(), 409);
        assert_eq!(AppError::unprocessable_entity("x").status_code(), 422);
        assert_eq!(AppError::payload_too_large("x").status_code(), 413);
        assert_eq!(AppError::database("x").status_code(), 500);
        assert_eq!(AppError::external_service("x").status_code(), 502);
    }

    #[test]
    fn test_problem_details_uses_plain_message() {
        let problem = AppError::validation("Username already exists").to_problem_details();
        assert_eq!(problem.status, 400);
        assert_eq!(problem.title, "Validation Error");
        assert_eq!(problem.detail, "Username already exists");
        assert!(problem.r#type.ends_with("/validation"));
    }

    #[test]
    fn test_incomplete_request_flattens_details() {
        let err = AppError::incomplete_request(
            "Missing required information",
            json!({ "missing_fields": ["sport"], "suggestions": " Please specify" }),
        );
        let value = serde_json::to_value(err.to_problem_details()).unwrap();

        assert_eq!(value["status"], 400);
        assert_eq!(value["detail"], "Missing required information");
        assert_eq!(value["missing_fields"], json!(["sport"]));
        assert_eq!(value["suggestions"], " Please specify");
        assert!(value.get("instance").is_none());
    }

    #[tokio::test]
    async fn test_into_response() {
        let response = AppError::forbidden("Only the host can delete this game").into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/problem+json"
        );

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["detail"], "Only the host can delete this game");
    }
}
