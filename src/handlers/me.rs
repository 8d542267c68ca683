//! 当前调用者信息

use crate::{error::AppError, guard::RequestContext, middleware::AppState};
use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;
use std::sync::Arc;

/// 返回调用者身份、生效的健身房范围和角色权限
pub async fn get_me(
    State(state): State<Arc<AppState>>,
    context: RequestContext,
) -> Result<impl IntoResponse, AppError> {
    let permissions = state
        .role_service
        .permission_keys_for_role_code(&context.caller.role)
        .await?;

    Ok(Json(json!({
        "user_id": context.caller.user_id,
        "role": context.caller.role,
        "gym_id": context.scope.gym_id(),
        "is_super_admin": state.guard_chain.is_super_admin(&context.caller),
        "permissions": permissions,
    })))
}
