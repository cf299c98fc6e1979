//! 通知仓库实现

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, Row};
use uuid::Uuid;

use application::dto::NotificationStats;
use application::repository::NotificationRepository;
use domain::{Notification, NotificationId, NotificationKind, RepositoryError, UserId};

use crate::db::repositories::map_sqlx_err;
use crate::db::DbPool;

#[derive(Debug, Clone, FromRow)]
struct NotificationRecord {
    id: Uuid,
    user_id: Uuid,
    kind: NotificationKind,
    title: String,
    message: String,
    data: Json<serde_json::Value>,
    is_read: bool,
    created_at: DateTime<Utc>,
}

impl From<NotificationRecord> for Notification {
    fn from(record: NotificationRecord) -> Self {
        Notification {
            id: NotificationId::from(record.id),
            user_id: UserId::from(record.user_id),
            kind: record.kind,
            title: record.title,
            message: record.message,
            data: record.data.0,
            is_read: record.is_read,
            created_at: record.created_at,
        }
    }
}

const NOTIFICATION_COLUMNS: &str = "id, user_id, kind, title, message, data, is_read, created_at";

pub struct PostgresNotificationRepository {
    pool: Arc<DbPool>,
}

impl PostgresNotificationRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationRepository for PostgresNotificationRepository {
    async fn create(&self, notification: Notification) -> Result<Notification, RepositoryError> {
        let record = sqlx::query_as::<_, NotificationRecord>(&format!(
            r#"
            INSERT INTO notifications (id, user_id, kind, title, message, data, is_read, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {NOTIFICATION_COLUMNS}
            "#
        ))
        .bind(Uuid::from(notification.id))
        .bind(Uuid::from(notification.user_id))
        .bind(notification.kind)
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(Json(&notification.data))
        .bind(notification.is_read)
        .bind(notification.created_at)
        .fetch_one(&*self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(record.into())
    }

    async fn find_by_id(
        &self,
        id: NotificationId,
    ) -> Result<Option<Notification>, RepositoryError> {
        let record = sqlx::query_as::<_, NotificationRecord>(&format!(
            r#"SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = $1"#
        ))
        .bind(Uuid::from(id))
        .fetch_optional(&*self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(record.map(Notification::from))
    }

    async fn mark_read(&self, id: NotificationId) -> Result<Notification, RepositoryError> {
        let record = sqlx::query_as::<_, NotificationRecord>(&format!(
            r#"
            UPDATE notifications SET is_read = true
            WHERE id = $1 AND is_read = false
            RETURNING {NOTIFICATION_COLUMNS}
            "#
        ))
        .bind(Uuid::from(id))
        .fetch_optional(&*self.pool)
        .await
        .map_err(map_sqlx_err)?;

        match record {
            Some(record) => Ok(record.into()),
            None => {
                let exists: bool = sqlx::query_scalar(
                    r#"SELECT EXISTS(SELECT 1 FROM notifications WHERE id = $1)"#,
                )
                .bind(Uuid::from(id))
                .fetch_one(&*self.pool)
                .await
                .map_err(map_sqlx_err)?;
                if exists {
                    Err(RepositoryError::Conflict)
                } else {
                    Err(RepositoryError::NotFound)
                }
            }
        }
    }

    async fn mark_all_read(&self, user_id: UserId) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            r#"UPDATE notifications SET is_read = true WHERE user_id = $1 AND is_read = false"#,
        )
        .bind(Uuid::from(user_id))
        .execute(&*self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(result.rows_affected())
    }

    async fn list_for_user(
        &self,
        user_id: UserId,
        unread_only: bool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Notification>, RepositoryError> {
        let filter = if unread_only {
            "WHERE user_id = $1 AND is_read = false"
        } else {
            "WHERE user_id = $1"
        };
        let records = sqlx::query_as::<_, NotificationRecord>(&format!(
            r#"
            SELECT {NOTIFICATION_COLUMNS} FROM notifications
            {filter}
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(Uuid::from(user_id))
        .bind(limit)
        .bind(offset)
        .fetch_all(&*self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(records.into_iter().map(Notification::from).collect())
    }

    async fn unread_count(&self, user_id: UserId) -> Result<u64, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND is_read = false"#,
        )
        .bind(Uuid::from(user_id))
        .fetch_one(&*self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(count as u64)
    }

    async fn stats(&self, user_id: UserId) -> Result<NotificationStats, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE is_read = false) AS unread,
                COUNT(*) FILTER (WHERE is_read = true) AS read,
                COUNT(*) FILTER (WHERE kind = 'user_liked_you') AS user_liked_you,
                COUNT(*) FILTER (WHERE kind = 'message_received') AS message_received,
                COUNT(*) FILTER (WHERE kind = 'mutual_match') AS mutual_match
            FROM notifications
            WHERE user_id = $1
            "#,
        )
        .bind(Uuid::from(user_id))
        .fetch_one(&*self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(NotificationStats {
            total: row.get::<i64, _>("total") as u64,
            unread: row.get::<i64, _>("unread") as u64,
            read: row.get::<i64, _>("read") as u64,
            user_liked_you: row.get::<i64, _>("user_liked_you") as u64,
            message_received: row.get::<i64, _>("message_received") as u64,
            mutual_match: row.get::<i64, _>("mutual_match") as u64,
        })
    }
}
