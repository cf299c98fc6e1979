//! 消息仓库实现
//!
//! 写入走事务：先锁会话行复核 active 状态（防御与 unmatch 的
//! 并发竞争），再插入消息并刷新 last_message_at。

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use application::repository::MessageRepository;
use domain::{
    ConversationId, ConversationStatus, Message, MessageContent, MessageId, RepositoryError,
    UserId,
};

use crate::db::repositories::map_sqlx_err;
use crate::db::DbPool;

#[derive(Debug, Clone, FromRow)]
struct MessageRecord {
    id: Uuid,
    conversation_id: Uuid,
    sender_id: Uuid,
    content: String,
    is_read: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<MessageRecord> for Message {
    type Error = RepositoryError;

    fn try_from(record: MessageRecord) -> Result<Self, Self::Error> {
        let content = MessageContent::new(record.content)
            .map_err(|err| RepositoryError::storage(format!("corrupt message row: {err}")))?;
        Ok(Message {
            id: MessageId::from(record.id),
            conversation_id: ConversationId::from(record.conversation_id),
            sender_id: UserId::from(record.sender_id),
            content,
            is_read: record.is_read,
            created_at: record.created_at,
        })
    }
}

const MESSAGE_COLUMNS: &str = "id, conversation_id, sender_id, content, is_read, created_at";

pub struct PostgresMessageRepository {
    pool: Arc<DbPool>,
}

impl PostgresMessageRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageRepository for PostgresMessageRepository {
    async fn create_in_conversation(
        &self,
        message: Message,
    ) -> Result<(Message, bool), RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_err)?;

        // 锁行复核：unmatch 的并发提交会在这里被拦下
        let status: Option<ConversationStatus> = sqlx::query_scalar(
            r#"SELECT status FROM conversations WHERE id = $1 FOR UPDATE"#,
        )
        .bind(Uuid::from(message.conversation_id))
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;

        match status {
            None => return Err(RepositoryError::NotFound),
            Some(ConversationStatus::Unmatched) => return Err(RepositoryError::Conflict),
            Some(ConversationStatus::Active) => {}
        }

        let had_messages: bool = sqlx::query_scalar(
            r#"SELECT EXISTS(SELECT 1 FROM messages WHERE conversation_id = $1)"#,
        )
        .bind(Uuid::from(message.conversation_id))
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;

        let record = sqlx::query_as::<_, MessageRecord>(&format!(
            r#"
            INSERT INTO messages (id, conversation_id, sender_id, content, is_read, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {MESSAGE_COLUMNS}
            "#
        ))
        .bind(Uuid::from(message.id))
        .bind(Uuid::from(message.conversation_id))
        .bind(Uuid::from(message.sender_id))
        .bind(message.content.as_str())
        .bind(message.is_read)
        .bind(message.created_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;

        sqlx::query(
            r#"UPDATE conversations SET last_message_at = $2, updated_at = $2 WHERE id = $1"#,
        )
        .bind(record.conversation_id)
        .bind(record.created_at)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;

        tx.commit().await.map_err(map_sqlx_err)?;
        Ok((record.try_into()?, !had_messages))
    }

    async fn find_by_id(&self, id: MessageId) -> Result<Option<Message>, RepositoryError> {
        let record = sqlx::query_as::<_, MessageRecord>(&format!(
            r#"SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = $1"#
        ))
        .bind(Uuid::from(id))
        .fetch_optional(&*self.pool)
        .await
        .map_err(map_sqlx_err)?;

        record.map(Message::try_from).transpose()
    }

    async fn list_for_conversation(
        &self,
        conversation_id: ConversationId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Message>, RepositoryError> {
        let records = sqlx::query_as::<_, MessageRecord>(&format!(
            r#"
            SELECT {MESSAGE_COLUMNS} FROM messages
            WHERE conversation_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(Uuid::from(conversation_id))
        .bind(limit)
        .bind(offset)
        .fetch_all(&*self.pool)
        .await
        .map_err(map_sqlx_err)?;

        records.into_iter().map(Message::try_from).collect()
    }

    async fn last_message(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Option<Message>, RepositoryError> {
        let record = sqlx::query_as::<_, MessageRecord>(&format!(
            r#"
            SELECT {MESSAGE_COLUMNS} FROM messages
            WHERE conversation_id = $1
            ORDER BY created_at DESC
            LIMIT 1
            "#
        ))
        .bind(Uuid::from(conversation_id))
        .fetch_optional(&*self.pool)
        .await
        .map_err(map_sqlx_err)?;

        record.map(Message::try_from).transpose()
    }

    async fn mark_read(
        &self,
        conversation_id: ConversationId,
        viewer_id: UserId,
    ) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE messages SET is_read = true
            WHERE conversation_id = $1 AND sender_id <> $2 AND is_read = false
            "#,
        )
        .bind(Uuid::from(conversation_id))
        .bind(Uuid::from(viewer_id))
        .execute(&*self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(result.rows_affected())
    }

    async fn unread_count(
        &self,
        conversation_id: ConversationId,
        viewer_id: UserId,
    ) -> Result<u64, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM messages
            WHERE conversation_id = $1 AND sender_id <> $2 AND is_read = false
            "#,
        )
        .bind(Uuid::from(conversation_id))
        .bind(Uuid::from(viewer_id))
        .fetch_one(&*self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(count as u64)
    }

    async fn total_unread_count(&self, viewer_id: UserId) -> Result<u64, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM messages m
            JOIN conversations c ON c.id = m.conversation_id
            WHERE (c.participant_low_id = $1 OR c.participant_high_id = $1)
              AND c.status = 'active'
              AND m.sender_id <> $1 AND m.is_read = false
            "#,
        )
        .bind(Uuid::from(viewer_id))
        .fetch_one(&*self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(count as u64)
    }
}
