//! 角色管理的 HTTP 处理器
//! 访问控制由路由声明的守卫链完成，这里只做业务调用

use crate::{
    error::AppError,
    guard::RequestContext,
    middleware::AppState,
    models::role::*,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Default, Deserialize)]
pub struct RoleListQuery {
    #[serde(default)]
    pub include_archived: bool,
}

// ==================== Roles ====================

/// 列出角色
pub async fn list_roles(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RoleListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let roles = state.role_service.list(query.include_archived).await?;

    Ok(Json(json!({
        "roles": roles,
        "count": roles.len()
    })))
}

/// 创建角色
pub async fn create_role(
    State(state): State<Arc<AppState>>,
    context: RequestContext,
    Json(req): Json<CreateRoleRequest>,
) -> Result<impl IntoResponse, AppError> {
    let role = state.role_service.create(req, context.caller.user_id).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "角色创建成功",
            "role": role
        })),
    ))
}

/// 获取角色详情（含权限）
pub async fn get_role(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let detail = state.role_service.get(id).await?;
    Ok(Json(detail))
}

/// 更新角色
pub async fn update_role(
    State(state): State<Arc<AppState>>,
    context: RequestContext,
    Path(id): Path<i32>,
    Json(req): Json<UpdateRoleRequest>,
) -> Result<impl IntoResponse, AppError> {
    let role = state.role_service.update(id, req, context.caller.user_id).await?;

    Ok(Json(json!({
        "message": "角色更新成功",
        "role": role
    })))
}

/// 归档角色
pub async fn archive_role(
    State(state): State<Arc<AppState>>,
    context: RequestContext,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let role = state.role_service.archive(id, context.caller.user_id).await?;

    Ok(Json(json!({
        "message": "角色已归档",
        "role": role
    })))
}

/// 删除角色
pub async fn delete_role(
    State(state): State<Arc<AppState>>,
    context: RequestContext,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    state.role_service.delete(id).await?;

    tracing::info!(role_id = id, actor = %context.caller.user_id, "Role deleted via API");

    Ok(Json(json!({
        "message": "角色删除成功"
    })))
}

// ==================== Permissions ====================

/// 列出所有权限
pub async fn list_permissions(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let permissions = state.role_service.list_permissions().await?;

    Ok(Json(json!({
        "permissions": permissions,
        "count": permissions.len()
    })))
}

/// 获取角色的权限
pub async fn get_role_permissions(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let permissions = state.role_service.permissions_for_role(id).await?;

    Ok(Json(json!({
        "role_id": id,
        "permissions": permissions,
        "count": permissions.len()
    })))
}

/// 为角色分配权限
pub async fn assign_permission(
    State(state): State<Arc<AppState>>,
    context: RequestContext,
    Path((id, permission_id)): Path<(i32, i32)>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = state.role_service.assign_permission(id, permission_id).await?;

    tracing::info!(
        role_id = id,
        permission_id,
        actor = %context.caller.user_id,
        ?outcome,
        "Permission assignment requested"
    );

    let status = match outcome {
        AssignOutcome::Assigned => StatusCode::CREATED,
        AssignOutcome::AlreadyAssigned => StatusCode::OK,
    };
    Ok((status, Json(json!({ "outcome": outcome }))))
}

/// 撤销角色权限
pub async fn revoke_permission(
    State(state): State<Arc<AppState>>,
    context: RequestContext,
    Path((id, permission_id)): Path<(i32, i32)>,
) -> Result<impl IntoResponse, AppError> {
    let removed = state.role_service.revoke_permission(id, permission_id).await?;

    tracing::info!(
        role_id = id,
        permission_id,
        actor = %context.caller.user_id,
        removed,
        "Permission revoked"
    );

    Ok(Json(json!({ "removed": removed })))
}

// ==================== Seed ====================

/// 写入内置角色和权限
pub async fn seed_defaults(
    State(state): State<Arc<AppState>>,
    context: RequestContext,
) -> Result<impl IntoResponse, AppError> {
    let report = state.role_service.seed_defaults(Some(context.caller.user_id)).await?;

    Ok(Json(json!({
        "report": report,
        "changed": !report.is_noop()
    })))
}
