//! 认证：从 Bearer 令牌构建调用者身份

use crate::{auth::jwt::JwtService, error::AppError, tenancy::GymId};
use axum::http::HeaderMap;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

/// 调用者身份（每个请求构建一次）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallerIdentity {
    pub user_id: Uuid,
    /// 平台级账户为 None
    pub gym_id: Option<GymId>,
    pub role: String,
}

/// 认证器：验证请求凭证并返回调用者身份
pub trait Authenticator: Send + Sync {
    fn authenticate(&self, headers: &HeaderMap) -> Result<CallerIdentity, AppError>;
}

/// 从 Authorization 头提取令牌
pub fn extract_token(headers: &HeaderMap) -> Result<String, AppError> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or(AppError::Unauthorized)
}

/// 基于 JWT 访问令牌的认证器
pub struct JwtAuthenticator {
    jwt_service: Arc<JwtService>,
}

impl JwtAuthenticator {
    pub fn new(jwt_service: Arc<JwtService>) -> Self {
        Self { jwt_service }
    }
}

impl Authenticator for JwtAuthenticator {
    fn authenticate(&self, headers: &HeaderMap) -> Result<CallerIdentity, AppError> {
        let token = extract_token(headers)?;
        let claims = self.jwt_service.validate_access_token(&token)?;

        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AppError::Unauthorized)?;
        if claims.role.trim().is_empty() {
            tracing::debug!(user_id = %user_id, "Token carries no role");
            return Err(AppError::Unauthorized);
        }

        Ok(CallerIdentity {
            user_id,
            gym_id: claims.gym_id,
            role: claims.role,
        })
    }
}
