//! Trainer repository；所有查询都带 gym_id 条件

use crate::{error::AppError, models::trainer::*, tenancy::GymId};
use sqlx::PgPool;
use uuid::Uuid;

pub struct TrainerRepository {
    db: PgPool,
}

impl TrainerRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list(&self, gym_id: GymId, include_archived: bool) -> Result<Vec<Trainer>, AppError> {
        let trainers = sqlx::query_as::<_, Trainer>(
            r#"
            SELECT * FROM trainers
            WHERE gym_id = $1 AND ($2 OR is_archived = FALSE)
            ORDER BY full_name
            "#,
        )
        .bind(gym_id)
        .bind(include_archived)
        .fetch_all(&self.db)
        .await?;

        Ok(trainers)
    }

    pub async fn find(&self, gym_id: GymId, id: Uuid) -> Result<Option<Trainer>, AppError> {
        let trainer =
            sqlx::query_as::<_, Trainer>("SELECT * FROM trainers WHERE gym_id = $1 AND id = $2")
                .bind(gym_id)
                .bind(id)
                .fetch_optional(&self.db)
                .await?;

        Ok(trainer)
    }

    pub async fn create(
        &self,
        gym_id: GymId,
        req: &CreateTrainerRequest,
        created_by: Uuid,
    ) -> Result<Trainer, AppError> {
        let trainer = sqlx::query_as::<_, Trainer>(
            r#"
            INSERT INTO trainers (id, gym_id, full_name, email, specialty, created_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(gym_id)
        .bind(&req.full_name)
        .bind(&req.email)
        .bind(&req.specialty)
        .bind(created_by)
        .fetch_one(&self.db)
        .await?;

        Ok(trainer)
    }

    pub async fn archive(&self, gym_id: GymId, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE trainers
            SET is_archived = TRUE, updated_at = NOW()
            WHERE gym_id = $1 AND id = $2 AND is_archived = FALSE
            "#,
        )
        .bind(gym_id)
        .bind(id)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// 各健身房在职教练数；指定 gym_id 时只统计该健身房
    pub async fn count_by_gym(&self, gym_id: Option<GymId>) -> Result<Vec<GymTrainerCount>, AppError> {
        let counts = sqlx::query_as::<_, GymTrainerCount>(
            r#"
            SELECT gym_id, COUNT(*) AS trainers
            FROM trainers
            WHERE is_archived = FALSE AND ($1::INTEGER IS NULL OR gym_id = $1)
            GROUP BY gym_id
            ORDER BY gym_id
            "#,
        )
        .bind(gym_id)
        .fetch_all(&self.db)
        .await?;

        Ok(counts)
    }
}
