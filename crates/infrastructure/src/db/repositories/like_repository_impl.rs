//! Like 仓库实现
//!
//! (sender_id, receiver_id) 上有唯一索引；并发重复插入由 23505
//! 翻译为 Conflict。状态转换用条件更新，只有 pending 行会被改写。

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use application::repository::LikeRepository;
use domain::{Like, LikeId, LikeStatus, RepositoryError, Timestamp, UserId};

use crate::db::repositories::map_sqlx_err;
use crate::db::DbPool;

#[derive(Debug, Clone, FromRow)]
struct LikeRecord {
    id: Uuid,
    sender_id: Uuid,
    receiver_id: Uuid,
    status: LikeStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<LikeRecord> for Like {
    fn from(record: LikeRecord) -> Self {
        Like {
            id: LikeId::from(record.id),
            sender_id: UserId::from(record.sender_id),
            receiver_id: UserId::from(record.receiver_id),
            status: record.status,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

const LIKE_COLUMNS: &str = "id, sender_id, receiver_id, status, created_at, updated_at";

pub struct PostgresLikeRepository {
    pool: Arc<DbPool>,
}

impl PostgresLikeRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LikeRepository for PostgresLikeRepository {
    async fn create(&self, like: Like) -> Result<Like, RepositoryError> {
        let record = sqlx::query_as::<_, LikeRecord>(&format!(
            r#"
            INSERT INTO likes (id, sender_id, receiver_id, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {LIKE_COLUMNS}
            "#
        ))
        .bind(Uuid::from(like.id))
        .bind(Uuid::from(like.sender_id))
        .bind(Uuid::from(like.receiver_id))
        .bind(like.status)
        .bind(like.created_at)
        .bind(like.updated_at)
        .fetch_one(&*self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(record.into())
    }

    async fn find_by_id(&self, id: LikeId) -> Result<Option<Like>, RepositoryError> {
        let record = sqlx::query_as::<_, LikeRecord>(&format!(
            r#"SELECT {LIKE_COLUMNS} FROM likes WHERE id = $1"#
        ))
        .bind(Uuid::from(id))
        .fetch_optional(&*self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(record.map(Like::from))
    }

    async fn find_pair(
        &self,
        sender_id: UserId,
        receiver_id: UserId,
    ) -> Result<Option<Like>, RepositoryError> {
        let record = sqlx::query_as::<_, LikeRecord>(&format!(
            r#"SELECT {LIKE_COLUMNS} FROM likes WHERE sender_id = $1 AND receiver_id = $2"#
        ))
        .bind(Uuid::from(sender_id))
        .bind(Uuid::from(receiver_id))
        .fetch_optional(&*self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(record.map(Like::from))
    }

    async fn update_status_if_pending(
        &self,
        id: LikeId,
        new_status: LikeStatus,
        updated_at: Timestamp,
    ) -> Result<Like, RepositoryError> {
        let record = sqlx::query_as::<_, LikeRecord>(&format!(
            r#"
            UPDATE likes
            SET status = $2, updated_at = $3
            WHERE id = $1 AND status = 'pending'
            RETURNING {LIKE_COLUMNS}
            "#
        ))
        .bind(Uuid::from(id))
        .bind(new_status)
        .bind(updated_at)
        .fetch_optional(&*self.pool)
        .await
        .map_err(map_sqlx_err)?;

        match record {
            Some(record) => Ok(record.into()),
            // 零行更新：区分"不存在"和"已被并发处理"
            None => {
                let exists: bool =
                    sqlx::query_scalar(r#"SELECT EXISTS(SELECT 1 FROM likes WHERE id = $1)"#)
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

    async fn list_received(
        &self,
        receiver_id: UserId,
        status: LikeStatus,
    ) -> Result<Vec<Like>, RepositoryError> {
        let records = sqlx::query_as::<_, LikeRecord>(&format!(
            r#"
            SELECT {LIKE_COLUMNS} FROM likes
            WHERE receiver_id = $1 AND status = $2
            ORDER BY created_at DESC
            "#
        ))
        .bind(Uuid::from(receiver_id))
        .bind(status)
        .fetch_all(&*self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(records.into_iter().map(Like::from).collect())
    }

    async fn list_sent(&self, sender_id: UserId) -> Result<Vec<Like>, RepositoryError> {
        let records = sqlx::query_as::<_, LikeRecord>(&format!(
            r#"
            SELECT {LIKE_COLUMNS} FROM likes
            WHERE sender_id = $1
            ORDER BY created_at DESC
            "#
        ))
        .bind(Uuid::from(sender_id))
        .fetch_all(&*self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(records.into_iter().map(Like::from).collect())
    }

    async fn count_received(
        &self,
        receiver_id: UserId,
        status: LikeStatus,
    ) -> Result<u64, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM likes WHERE receiver_id = $1 AND status = $2"#,
        )
        .bind(Uuid::from(receiver_id))
        .bind(status)
        .fetch_one(&*self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(count as u64)
    }
}
