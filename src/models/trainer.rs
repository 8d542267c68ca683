//! Trainer model (tenant-scoped)

use crate::tenancy::GymId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Trainer {
    pub id: Uuid,
    pub gym_id: GymId,
    pub full_name: String,
    pub email: Option<String>,
    pub specialty: Option<String>,
    pub is_archived: bool,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateTrainerRequest {
    #[validate(length(min = 1, max = 128))]
    pub full_name: String,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 128))]
    pub specialty: Option<String>,
}

/// Trainer list filters
#[derive(Debug, Default, Deserialize)]
pub struct TrainerListQuery {
    #[serde(default)]
    pub include_archived: bool,
}

/// Active trainer count for one gym
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct GymTrainerCount {
    pub gym_id: GymId,
    pub trainers: i64,
}
