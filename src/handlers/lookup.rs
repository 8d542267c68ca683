//! 受控词表查询

use crate::{error::AppError, middleware::AppState};
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::sync::Arc;

pub async fn list_lookups(
    State(state): State<Arc<AppState>>,
    Path(type_code): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let repo = crate::repository::LookupRepository::new(state.db.clone());
    let lookups = repo
        .list_by_type(&type_code)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Lookup type '{}' not found", type_code)))?;

    Ok(Json(json!({
        "type": type_code,
        "lookups": lookups,
        "count": lookups.len()
    })))
}
