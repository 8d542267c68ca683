//! 健身房上下文解析
//!
//! 决定一个请求可以在哪个健身房（租户）范围内执行：
//! 令牌中的健身房永远优先，非超级管理员无法通过查询参数切换租户；
//! 超级管理员没有令牌健身房，必须通过 `gymId` 显式指定。

use crate::error::AppError;
use axum::{extract::Query, http::Uri};
use serde::Serialize;

/// 健身房（租户）标识
pub type GymId = i32;

/// 查询参数名
pub const GYM_ID_PARAM: &str = "gymId";
const GYM_ID_PARAM_ALIAS: &str = "gym_id";

/// 单个请求的有效健身房范围
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "gym_id", rename_all = "snake_case")]
pub enum GymScope {
    Gym(GymId),
    /// 平台级视图，未绑定任何健身房
    Unscoped,
}

impl GymScope {
    pub fn gym_id(&self) -> Option<GymId> {
        match self {
            GymScope::Gym(id) => Some(*id),
            GymScope::Unscoped => None,
        }
    }
}

impl From<Option<GymId>> for GymScope {
    fn from(value: Option<GymId>) -> Self {
        value.map_or(GymScope::Unscoped, GymScope::Gym)
    }
}

/// 解析必需的健身房上下文
pub fn resolve_gym_id(
    token_gym_id: Option<GymId>,
    query_gym_id: Option<&str>,
    is_super_admin: bool,
) -> Result<GymId, AppError> {
    if let Some(gym_id) = token_gym_id {
        return Ok(gym_id);
    }

    match non_blank(query_gym_id) {
        Some(raw) if is_super_admin => {
            parse_gym_id(raw).ok_or_else(|| AppError::bad_request("Invalid gymId parameter"))
        }
        _ => Err(AppError::forbidden(
            "operation requires a gym context; superadmins must supply gymId",
        )),
    }
}

/// 解析可选的健身房上下文，从不失败
///
/// 无法解析的 `gymId` 被视为未提供。
pub fn resolve_optional_gym_id(
    token_gym_id: Option<GymId>,
    query_gym_id: Option<&str>,
) -> Option<GymId> {
    token_gym_id.or_else(|| non_blank(query_gym_id).and_then(parse_gym_id))
}

/// 从请求 URI 的查询参数中取出 `gymId`（兼容 `gym_id`），已做百分号解码
///
/// 同时出现时 `gymId` 优先；同名参数重复时取第一个。
pub fn gym_id_from_uri(uri: &Uri) -> Option<String> {
    let Query(pairs) = match Query::<Vec<(String, String)>>::try_from_uri(uri) {
        Ok(query) => query,
        Err(e) => {
            tracing::debug!(error = %e, "Failed to decode query string");
            return None;
        }
    };

    let find = |name: &str| pairs.iter().find(|(key, _)| key == name).map(|(_, v)| v.clone());
    find(GYM_ID_PARAM).or_else(|| find(GYM_ID_PARAM_ALIAS))
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_gym_id(raw: &str) -> Option<GymId> {
    raw.parse::<GymId>().ok().filter(|id| *id > 0)
}
