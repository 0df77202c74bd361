use sqlx::{Error, PgPool, Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::models::{NewNotification, Notification};

const NOTIFICATION_COLUMNS: &str =
    "id, user_id, complaint_id, notification_type, description, is_read, created_at, read_at";

pub struct NotificationRepository;

impl NotificationRepository {
    pub async fn insert(
        tx: &mut Transaction<'_, Postgres>,
        notification: &NewNotification,
        at: OffsetDateTime,
    ) -> Result<Notification, Error> {
        sqlx::query_as::<_, Notification>(&format!(
            r#"
            INSERT INTO notifications (id, user_id, complaint_id, notification_type, description, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {NOTIFICATION_COLUMNS}
            "#
        ))
        .bind(Uuid::now_v7())
        .bind(notification.user_id)
        .bind(notification.complaint_id)
        .bind(notification.notification_type)
        .bind(&notification.description)
        .bind(at)
        .fetch_one(&mut **tx)
        .await
    }

    pub async fn get_by_id(pool: &PgPool, notification_id: Uuid) -> Result<Option<Notification>, Error> {
        sqlx::query_as::<_, Notification>(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = $1"
        ))
        .bind(notification_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn list_for_user(
        pool: &PgPool,
        user_id: Uuid,
        unread_only: bool,
    ) -> Result<Vec<Notification>, Error> {
        sqlx::query_as::<_, Notification>(&format!(
            r#"
            SELECT {NOTIFICATION_COLUMNS} FROM notifications
            WHERE user_id = $1 AND (NOT $2 OR is_read = FALSE)
            ORDER BY created_at DESC, id DESC
            "#
        ))
        .bind(user_id)
        .bind(unread_only)
        .fetch_all(pool)
        .await
    }

    pub async fn list_for_complaint(
        pool: &PgPool,
        complaint_id: Uuid,
    ) -> Result<Vec<Notification>, Error> {
        sqlx::query_as::<_, Notification>(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE complaint_id = $1 ORDER BY created_at, id"
        ))
        .bind(complaint_id)
        .fetch_all(pool)
        .await
    }

    pub async fn mark_read(
        pool: &PgPool,
        notification_id: Uuid,
        at: OffsetDateTime,
    ) -> Result<Option<Notification>, Error> {
        sqlx::query_as::<_, Notification>(&format!(
            r#"
            UPDATE notifications
            SET is_read = TRUE, read_at = COALESCE(read_at, $1)
            WHERE id = $2
            RETURNING {NOTIFICATION_COLUMNS}
            "#
        ))
        .bind(at)
        .bind(notification_id)
        .fetch_optional(pool)
        .await
    }
}
