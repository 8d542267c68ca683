//! 通知的 HTTP 处理器

use crate::{
    error::AppError,
    guard::{RequestContext, ScopedGym},
    middleware::AppState,
    models::notification::*,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    ScopedGym(gym_id): ScopedGym,
    context: RequestContext,
    Query(query): Query<NotificationListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let notifications = state
        .notification_service
        .list(gym_id, context.caller.user_id, &query)
        .await?;

    Ok(Json(json!({
        "gym_id": gym_id,
        "notifications": notifications,
        "count": notifications.len()
    })))
}

pub async fn create_notification(
    State(state): State<Arc<AppState>>,
    ScopedGym(gym_id): ScopedGym,
    context: RequestContext,
    Json(req): Json<CreateNotificationRequest>,
) -> Result<impl IntoResponse, AppError> {
    let notification = state
        .notification_service
        .create(gym_id, req, context.caller.user_id)
        .await?;

    Ok((StatusCode::CREATED, Json(notification)))
}

pub async fn mark_notification_read(
    State(state): State<Arc<AppState>>,
    ScopedGym(gym_id): ScopedGym,
    context: RequestContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let notification = state
        .notification_service
        .mark_read(gym_id, id, context.caller.user_id)
        .await?;

    Ok(Json(notification))
}
