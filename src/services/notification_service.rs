//! 健身房内通知

use crate::{
    error::AppError,
    models::notification::*,
    repository::NotificationRepository,
    tenancy::GymId,
};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

pub struct NotificationService {
    repo: NotificationRepository,
}

impl NotificationService {
    pub fn new(db: PgPool) -> Self {
        Self { repo: NotificationRepository::new(db) }
    }

    pub async fn list(
        &self,
        gym_id: GymId,
        user_id: Uuid,
        query: &NotificationListQuery,
    ) -> Result<Vec<Notification>, AppError> {
        self.repo
            .list_for_user(gym_id, user_id, query.unread_only, query.effective_limit())
            .await
    }

    pub async fn create(
        &self,
        gym_id: GymId,
        req: CreateNotificationRequest,
        actor: Uuid,
    ) -> Result<Notification, AppError> {
        req.validate()?;

        let notification = self.repo.create(gym_id, &req, actor).await?;
        tracing::info!(
            gym_id,
            notification_id = %notification.id,
            broadcast = notification.recipient_id.is_none(),
            "Notification created"
        );
        Ok(notification)
    }

    pub async fn mark_read(&self, gym_id: GymId, id: Uuid, user_id: Uuid) -> Result<Notification, AppError> {
        self.repo
            .mark_read(gym_id, id, user_id)
            .await?
            .ok_or_else(|| AppError::not_found("Notification not found"))
    }
}
