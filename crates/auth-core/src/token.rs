//! JWT 令牌

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use promptplay_common::UserId;
use promptplay_errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const ACCESS_TOKEN_TYPE: &str = "access";

/// JWT Claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (username)
    pub sub: String,
    /// 用户 ID
    pub user_id: i64,
    /// Expiration time
    pub exp: i64,
    /// Issued at
    pub iat: i64,
    /// JWT ID
    pub jti: String,
    /// Issuer
    #[serde(default)]
    pub iss: String,
    /// Audience
    #[serde(default)]
    pub aud: String,
    /// Token type
    #[serde(default)]
    pub token_type: String,
}

impl Claims {
    pub fn new(
        user_id: UserId,
        username: &str,
        expires_in_secs: i64,
        issuer: &str,
        audience: &str,
    ) -> Self {
        let now = Utc::now();
        Self {
            sub: username.to_string(),
            user_id: user_id.value(),
            exp: (now + Duration::seconds(expires_in_secs)).timestamp(),
            iat: now.timestamp(),
            jti: Uuid::now_v7().to_string(),
            iss: issuer.to_string(),
            aud: audience.to_string(),
            token_type: ACCESS_TOKEN_TYPE.to_string(),
        }
    }

    pub fn user_id(&self) -> UserId {
        UserId(self.user_id)
    }

    pub fn username(&self) -> &str {
        &self.sub
    }

    pub fn is_access_token(&self) -> bool {
        self.token_type == ACCESS_TOKEN_TYPE
    }
}

/// Token 服务
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_expires_in: i64,
    issuer: String,
    audience: String,
}

impl TokenService {
    pub fn new(
        secret: &str,
        access_token_expires_in: i64,
        issuer: impl Into<String>,
        audience: impl Into<String>,
    ) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            access_token_expires_in,
            issuer: issuer.into(),
            audience: audience.into(),
        }
    }

    /// 生成访问令牌
    pub fn generate_access_token(&self, user_id: UserId, username: &str) -> AppResult<String> {
        self.generate_access_token_with_ttl(user_id, username, self.access_token_expires_in)
    }

    /// 生成指定有效期的访问令牌，负数有效期得到已过期的令牌
    pub fn generate_access_token_with_ttl(
        &self,
        user_id: UserId,
        username: &str,
        expires_in_secs: i64,
    ) -> AppResult<String> {
        let claims = Claims::new(
            user_id,
            username,
            expires_in_secs,
            &self.issuer,
            &self.audience,
        );

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("Failed to generate token: {}", e)))
    }

    /// 验证访问令牌
    pub fn validate_access_token(&self, token: &str) -> AppResult<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.validate_exp = true;
        validation.validate_nbf = false;
        validation.leeway = 0; // 不允许时间偏差

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| AppError::unauthorized(format!("Invalid token: {}", e)))?
            .claims;

        if claims.jti.is_empty() {
            return Err(AppError::unauthorized("Token ID (jti) missing"));
        }

        if !claims.is_access_token() {
            return Err(AppError::unauthorized("Not an access token"));
        }

        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new("test_secret", 3600, "promptplay", "promptplay-web")
    }

    #[test]
    fn test_create_and_decode_token() {
        let service = service();
        let token = service.generate_access_token(UserId(1), "testuser").unwrap();

        let claims = service.validate_access_token(&token).unwrap();
        assert_eq!(claims.username(), "testuser");
        assert_eq!(claims.user_id(), UserId(1));
        assert!(claims.is_access_token());
        assert!(!claims.jti.is_empty());
    }

    #[test]
    fn test_token_with_custom_expiry() {
        let service = service();
        let token = service
            .generate_access_token_with_ttl(UserId(1), "testuser", 1800)
            .unwrap();

        let claims = service.validate_access_token(&token).unwrap();
        let remaining = claims.exp - Utc::now().timestamp();
        assert!((1795..=1805).contains(&remaining));
    }

    #[test]
    fn test_decode_invalid_token() {
        let result = service().validate_access_token("invalid.jwt.token");
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn test_decode_expired_token() {
        let service = service();
        let token = service
            .generate_access_token_with_ttl(UserId(1), "testuser", -1)
            .unwrap();

        assert!(service.validate_access_token(&token).is_err());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let other = TokenService::new("other_secret", 3600, "promptplay", "promptplay-web");
        let token = other.generate_access_token(UserId(1), "testuser").unwrap();

        assert!(service().validate_access_token(&token).is_err());
    }

    #[test]
    fn test_wrong_audience_rejected() {
        let other = TokenService::new("test_secret", 3600, "promptplay", "someone-else");
        let token = other.generate_access_token(UserId(1), "testuser").unwrap();

        assert!(service().validate_access_token(&token).is_err());
    }
}
