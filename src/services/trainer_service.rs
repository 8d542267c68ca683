//! 教练管理；所有操作都限定在已解析的健身房内

use crate::{
    error::AppError,
    models::trainer::*,
    repository::TrainerRepository,
    tenancy::GymId,
};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

pub struct TrainerService {
    repo: TrainerRepository,
}

impl TrainerService {
    pub fn new(db: PgPool) -> Self {
        Self { repo: TrainerRepository::new(db) }
    }

    pub async fn list(&self, gym_id: GymId, include_archived: bool) -> Result<Vec<Trainer>, AppError> {
        self.repo.list(gym_id, include_archived).await
    }

    pub async fn get(&self, gym_id: GymId, id: Uuid) -> Result<Trainer, AppError> {
        self.repo
            .find(gym_id, id)
            .await?
            .ok_or_else(|| AppError::not_found("Trainer not found"))
    }

    pub async fn create(
        &self,
        gym_id: GymId,
        req: CreateTrainerRequest,
        actor: Uuid,
    ) -> Result<Trainer, AppError> {
        req.validate()?;

        let trainer = self.repo.create(gym_id, &req, actor).await?;
        tracing::info!(gym_id, trainer_id = %trainer.id, actor = %actor, "Trainer created");
        Ok(trainer)
    }

    /// 已归档或不属于本健身房的教练返回 NotFound
    pub async fn archive(&self, gym_id: GymId, id: Uuid) -> Result<(), AppError> {
        if !self.repo.archive(gym_id, id).await? {
            return Err(AppError::not_found("Trainer not found"));
        }
        tracing::info!(gym_id, trainer_id = %id, "Trainer archived");
        Ok(())
    }

    /// 无作用域时统计全部健身房
    pub async fn summary(&self, gym_id: Option<GymId>) -> Result<Vec<GymTrainerCount>, AppError> {
        self.repo.count_by_gym(gym_id).await
    }
}
