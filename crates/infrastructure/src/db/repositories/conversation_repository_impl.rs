//! 会话仓库实现
//!
//! (participant_low_id, participant_high_id) 上有唯一索引，
//! 辅以 CHECK (participant_low_id < participant_high_id)。
//! unmatch 在一个事务内把会话和 origin like 一起置为 unmatched。

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use application::repository::ConversationRepository;
use domain::{
    Conversation, ConversationId, ConversationStatus, LikeId, RepositoryError, Timestamp, UserId,
};

use crate::db::repositories::map_sqlx_err;
use crate::db::DbPool;

#[derive(Debug, Clone, FromRow)]
struct ConversationRecord {
    id: Uuid,
    participant_low_id: Uuid,
    participant_high_id: Uuid,
    status: ConversationStatus,
    origin_like_id: Uuid,
    last_message_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ConversationRecord> for Conversation {
    fn from(record: ConversationRecord) -> Self {
        Conversation {
            id: ConversationId::from(record.id),
            participant_low_id: UserId::from(record.participant_low_id),
            participant_high_id: UserId::from(record.participant_high_id),
            status: record.status,
            origin_like_id: LikeId::from(record.origin_like_id),
            last_message_at: record.last_message_at,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

const CONVERSATION_COLUMNS: &str = "id, participant_low_id, participant_high_id, status, \
                                    origin_like_id, last_message_at, created_at, updated_at";

pub struct PostgresConversationRepository {
    pool: Arc<DbPool>,
}

impl PostgresConversationRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConversationRepository for PostgresConversationRepository {
    async fn create(&self, conversation: Conversation) -> Result<Conversation, RepositoryError> {
        let record = sqlx::query_as::<_, ConversationRecord>(&format!(
            r#"
            INSERT INTO conversations
                (id, participant_low_id, participant_high_id, status,
                 origin_like_id, last_message_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {CONVERSATION_COLUMNS}
            "#
        ))
        .bind(Uuid::from(conversation.id))
        .bind(Uuid::from(conversation.participant_low_id))
        .bind(Uuid::from(conversation.participant_high_id))
        .bind(conversation.status)
        .bind(Uuid::from(conversation.origin_like_id))
        .bind(conversation.last_message_at)
        .bind(conversation.created_at)
        .bind(conversation.updated_at)
        .fetch_one(&*self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(record.into())
    }

    async fn find_by_id(
        &self,
        id: ConversationId,
    ) -> Result<Option<Conversation>, RepositoryError> {
        let record = sqlx::query_as::<_, ConversationRecord>(&format!(
            r#"SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = $1"#
        ))
        .bind(Uuid::from(id))
        .fetch_optional(&*self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(record.map(Conversation::from))
    }

    async fn find_by_pair(
        &self,
        low: UserId,
        high: UserId,
    ) -> Result<Option<Conversation>, RepositoryError> {
        let record = sqlx::query_as::<_, ConversationRecord>(&format!(
            r#"
            SELECT {CONVERSATION_COLUMNS} FROM conversations
            WHERE participant_low_id = $1 AND participant_high_id = $2
            "#
        ))
        .bind(Uuid::from(low))
        .bind(Uuid::from(high))
        .fetch_optional(&*self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(record.map(Conversation::from))
    }

    async fn unmatch(
        &self,
        id: ConversationId,
        updated_at: Timestamp,
    ) -> Result<Conversation, RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_err)?;

        let record = sqlx::query_as::<_, ConversationRecord>(&format!(
            r#"
            UPDATE conversations
            SET status = 'unmatched', updated_at = $2
            WHERE id = $1 AND status = 'active'
            RETURNING {CONVERSATION_COLUMNS}
            "#
        ))
        .bind(Uuid::from(id))
        .bind(updated_at)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;

        let record = match record {
            Some(record) => record,
            None => {
                let exists: bool = sqlx::query_scalar(
                    r#"SELECT EXISTS(SELECT 1 FROM conversations WHERE id = $1)"#,
                )
                .bind(Uuid::from(id))
                .fetch_one(&mut *tx)
                .await
                .map_err(map_sqlx_err)?;
                return Err(if exists {
                    RepositoryError::Conflict
                } else {
                    RepositoryError::NotFound
                });
            }
        };

        // origin like 在同一事务内联动转换；rejected 不受影响
        sqlx::query(
            r#"
            UPDATE likes
            SET status = 'unmatched', updated_at = $2
            WHERE id = $1 AND status IN ('pending', 'accepted')
            "#,
        )
        .bind(record.origin_like_id)
        .bind(updated_at)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;

        tx.commit().await.map_err(map_sqlx_err)?;
        Ok(record.into())
    }

    async fn list_for_user(
        &self,
        user_id: UserId,
        status: Option<ConversationStatus>,
    ) -> Result<Vec<Conversation>, RepositoryError> {
        let records = match status {
            Some(status) => {
                sqlx::query_as::<_, ConversationRecord>(&format!(
                    r#"
                    SELECT {CONVERSATION_COLUMNS} FROM conversations
                    WHERE (participant_low_id = $1 OR participant_high_id = $1)
                      AND status = $2
                    ORDER BY last_message_at DESC NULLS LAST, created_at DESC
                    "#
                ))
                .bind(Uuid::from(user_id))
                .bind(status)
                .fetch_all(&*self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, ConversationRecord>(&format!(
                    r#"
                    SELECT {CONVERSATION_COLUMNS} FROM conversations
                    WHERE participant_low_id = $1 OR participant_high_id = $1
                    ORDER BY last_message_at DESC NULLS LAST, created_at DESC
                    "#
                ))
                .bind(Uuid::from(user_id))
                .fetch_all(&*self.pool)
                .await
            }
        }
        .map_err(map_sqlx_err)?;

        Ok(records.into_iter().map(Conversation::from).collect())
    }
}
