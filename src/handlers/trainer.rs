//! 教练管理的 HTTP 处理器

use crate::{
    error::AppError,
    guard::{RequestContext, ScopedGym},
    middleware::AppState,
    models::trainer::*,
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

pub async fn list_trainers(
    State(state): State<Arc<AppState>>,
    ScopedGym(gym_id): ScopedGym,
    Query(query): Query<TrainerListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let trainers = state.trainer_service.list(gym_id, query.include_archived).await?;

    Ok(Json(json!({
        "gym_id": gym_id,
        "trainers": trainers,
        "count": trainers.len()
    })))
}

pub async fn create_trainer(
    State(state): State<Arc<AppState>>,
    ScopedGym(gym_id): ScopedGym,
    context: RequestContext,
    Json(req): Json<CreateTrainerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let trainer = state
        .trainer_service
        .create(gym_id, req, context.caller.user_id)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "教练创建成功",
            "trainer": trainer
        })),
    ))
}

pub async fn get_trainer(
    State(state): State<Arc<AppState>>,
    ScopedGym(gym_id): ScopedGym,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let trainer = state.trainer_service.get(gym_id, id).await?;
    Ok(Json(trainer))
}

pub async fn archive_trainer(
    State(state): State<Arc<AppState>>,
    ScopedGym(gym_id): ScopedGym,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state.trainer_service.archive(gym_id, id).await?;

    Ok(Json(json!({
        "message": "教练已归档"
    })))
}

/// 各健身房教练数；有作用域时只返回该健身房
pub async fn trainer_summary(
    State(state): State<Arc<AppState>>,
    context: RequestContext,
) -> Result<impl IntoResponse, AppError> {
    let gym_id = context.scope.gym_id();
    let counts = state.trainer_service.summary(gym_id).await?;

    Ok(Json(json!({
        "scope": context.scope,
        "gyms": counts
    })))
}
