//! Notification repository

use crate::{error::AppError, models::notification::*, tenancy::GymId};
use sqlx::PgPool;
use uuid::Uuid;

pub struct NotificationRepository {
    db: PgPool,
}

impl NotificationRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// 用户可见的通知：发给本人的和全馆广播，`is_read` 为该用户的已读状态
    pub async fn list_for_user(
        &self,
        gym_id: GymId,
        user_id: Uuid,
        unread_only: bool,
        limit: i64,
    ) -> Result<Vec<Notification>, AppError> {
        let notifications = sqlx::query_as::<_, Notification>(
            r#"
            SELECT n.id, n.gym_id, n.recipient_id, n.title, n.body, n.created_by, n.created_at,
                   (r.user_id IS NOT NULL) AS is_read
            FROM notifications n
            LEFT JOIN notification_reads r
              ON r.notification_id = n.id AND r.user_id = $2
            WHERE n.gym_id = $1
              AND (n.recipient_id IS NULL OR n.recipient_id = $2)
              AND ($3 = FALSE OR r.user_id IS NULL)
            ORDER BY n.created_at DESC
            LIMIT $4
            "#,
        )
        .bind(gym_id)
        .bind(user_id)
        .bind(unread_only)
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        Ok(notifications)
    }

    pub async fn create(
        &self,
        gym_id: GymId,
        req: &CreateNotificationRequest,
        created_by: Uuid,
    ) -> Result<Notification, AppError> {
        let notification = sqlx::query_as::<_, Notification>(
            r#"
            INSERT INTO notifications (id, gym_id, recipient_id, title, body, created_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, gym_id, recipient_id, title, body, created_by, created_at, FALSE AS is_read
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(gym_id)
        .bind(req.recipient_id)
        .bind(&req.title)
        .bind(&req.body)
        .bind(created_by)
        .fetch_one(&self.db)
        .await?;

        Ok(notification)
    }

    /// 记录当前用户已读，重复标记不报错
    pub async fn mark_read(
        &self,
        gym_id: GymId,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Notification>, AppError> {
        let notification = sqlx::query_as::<_, Notification>(
            r#"
            WITH target AS (
                SELECT id, gym_id, recipient_id, title, body, created_by, created_at
                FROM notifications
                WHERE gym_id = $1 AND id = $2 AND (recipient_id IS NULL OR recipient_id = $3)
            ), marked AS (
                INSERT INTO notification_reads (notification_id, user_id)
                SELECT id, $3 FROM target
                ON CONFLICT (notification_id, user_id) DO NOTHING
            )
            SELECT target.*, TRUE AS is_read FROM target
            "#,
        )
        .bind(gym_id)
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(notification)
    }
}
