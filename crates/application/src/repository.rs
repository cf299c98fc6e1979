//! 仓库端口定义
//!
//! 竞态防御（唯一约束、条件更新、事务内复核）是仓库的自然职责：
//! 应用层的存在性检查只是优化，正确性由存储层保证。
//! 实现需把唯一约束冲突和条件更新失败翻译为 `RepositoryError::Conflict`。

use async_trait::async_trait;
use domain::{
    Conversation, ConversationId, ConversationStatus, Like, LikeId, LikeStatus, Message,
    MessageId, Notification, NotificationId, RepositoryError, Timestamp, UserId, UserProfile,
};

use crate::dto::NotificationStats;

/// 用户只读视图；资料 CRUD 属于外部协作方。
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_profile(&self, id: UserId) -> Result<Option<UserProfile>, RepositoryError>;
}

#[async_trait]
pub trait LikeRepository: Send + Sync {
    /// 插入新 like；(sender_id, receiver_id) 唯一约束冲突返回 Conflict。
    async fn create(&self, like: Like) -> Result<Like, RepositoryError>;

    async fn find_by_id(&self, id: LikeId) -> Result<Option<Like>, RepositoryError>;

    /// 查找有向边 (sender, receiver) 上的 like。
    async fn find_pair(
        &self,
        sender_id: UserId,
        receiver_id: UserId,
    ) -> Result<Option<Like>, RepositoryError>;

    /// 条件更新（compare-and-swap）：仅当当前状态为 pending 时转换。
    /// 记录不存在返回 NotFound；存在但已非 pending 返回 Conflict。
    async fn update_status_if_pending(
        &self,
        id: LikeId,
        new_status: LikeStatus,
        updated_at: Timestamp,
    ) -> Result<Like, RepositoryError>;

    async fn list_received(
        &self,
        receiver_id: UserId,
        status: LikeStatus,
    ) -> Result<Vec<Like>, RepositoryError>;

    async fn list_sent(&self, sender_id: UserId) -> Result<Vec<Like>, RepositoryError>;

    async fn count_received(
        &self,
        receiver_id: UserId,
        status: LikeStatus,
    ) -> Result<u64, RepositoryError>;
}

#[async_trait]
pub trait ConversationRepository: Send + Sync {
    /// 插入新会话；规范对唯一约束冲突返回 Conflict。
    async fn create(&self, conversation: Conversation) -> Result<Conversation, RepositoryError>;

    async fn find_by_id(
        &self,
        id: ConversationId,
    ) -> Result<Option<Conversation>, RepositoryError>;

    async fn find_by_pair(
        &self,
        low: UserId,
        high: UserId,
    ) -> Result<Option<Conversation>, RepositoryError>;

    /// 在一个事务内把会话和 origin like 一起置为 unmatched。
    /// 会话必须仍为 active，否则返回 Conflict（已被并发解除）。
    async fn unmatch(
        &self,
        id: ConversationId,
        updated_at: Timestamp,
    ) -> Result<Conversation, RepositoryError>;

    /// 按 last_message_at 倒序（无消息的排最后）列出用户参与的会话。
    async fn list_for_user(
        &self,
        user_id: UserId,
        status: Option<ConversationStatus>,
    ) -> Result<Vec<Conversation>, RepositoryError>;
}

#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// 事务内：锁定会话行并复核状态（防御 unmatch 并发提交），
    /// 插入消息并把 last_message_at 刷新为已提交行的时间戳。
    /// 返回消息和"插入前会话是否没有任何消息"。
    /// 会话不存在返回 NotFound；会话已 unmatched 返回 Conflict。
    async fn create_in_conversation(
        &self,
        message: Message,
    ) -> Result<(Message, bool), RepositoryError>;

    async fn find_by_id(&self, id: MessageId) -> Result<Option<Message>, RepositoryError>;

    /// 按创建顺序倒序分页读取历史（unmatched 会话仍可读）。
    async fn list_for_conversation(
        &self,
        conversation_id: ConversationId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Message>, RepositoryError>;

    async fn last_message(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Option<Message>, RepositoryError>;

    /// 把对方发来的未读消息全部置为已读，返回更新条数（0 合法）。
    async fn mark_read(
        &self,
        conversation_id: ConversationId,
        viewer_id: UserId,
    ) -> Result<u64, RepositoryError>;

    async fn unread_count(
        &self,
        conversation_id: ConversationId,
        viewer_id: UserId,
    ) -> Result<u64, RepositoryError>;

    /// 用户在所有 active 会话中的未读总数。
    async fn total_unread_count(&self, viewer_id: UserId) -> Result<u64, RepositoryError>;
}

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn create(&self, notification: Notification) -> Result<Notification, RepositoryError>;

    async fn find_by_id(
        &self,
        id: NotificationId,
    ) -> Result<Option<Notification>, RepositoryError>;

    /// 条件更新：仅当未读时置为已读；已读返回 Conflict。
    async fn mark_read(&self, id: NotificationId) -> Result<Notification, RepositoryError>;

    /// 把用户的全部未读通知置为已读，返回条数。
    async fn mark_all_read(&self, user_id: UserId) -> Result<u64, RepositoryError>;

    async fn list_for_user(
        &self,
        user_id: UserId,
        unread_only: bool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Notification>, RepositoryError>;

    async fn unread_count(&self, user_id: UserId) -> Result<u64, RepositoryError>;

    async fn stats(&self, user_id: UserId) -> Result<NotificationStats, RepositoryError>;
}
